//! Database tests

use super::*;
use chrono::{Duration, Utc};
use tempfile::TempDir;

/// Helper to create a test database
async fn create_test_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let db = Database::connect(&db_path).await.unwrap();
    (db, temp_dir)
}

fn test_account(username: &str) -> Account {
    Account {
        id: EntityId::new().0,
        username: username.to_string(),
        display_name: Some(username.to_string()),
        note: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

async fn create_accounts(db: &Database, usernames: &[&str]) -> Vec<Account> {
    let mut accounts = Vec::new();
    for username in usernames {
        let account = test_account(username);
        assert!(db.insert_account(&account).await.unwrap());
        accounts.push(account);
    }
    accounts
}

fn test_message(conversation_id: &str, sender_id: &str, content: &str) -> Message {
    Message {
        id: EntityId::new().0,
        conversation_id: conversation_id.to_string(),
        sender_id: sender_id.to_string(),
        content: content.to_string(),
        message_type: "text".to_string(),
        reply_to_id: None,
        is_deleted: false,
        is_edited: false,
        created_at: Utc::now(),
        edited_at: None,
    }
}

#[tokio::test]
async fn test_database_connection() {
    let (_db, _temp_dir) = create_test_db().await;
    // Connection successful if we get here without panicking
}

#[tokio::test]
async fn test_account_insert_and_get() {
    let (db, _temp_dir) = create_test_db().await;

    let account = test_account("alice");
    assert!(db.insert_account(&account).await.unwrap());

    let retrieved = db.get_account(&account.id).await.unwrap().unwrap();
    assert_eq!(retrieved.username, "alice");

    let by_name = db.get_account_by_username("alice").await.unwrap();
    assert!(by_name.is_some());

    // Duplicate username is rejected without an error
    let duplicate = test_account("alice");
    assert!(!db.insert_account(&duplicate).await.unwrap());

    assert_eq!(db.count_accounts().await.unwrap(), 1);
}

#[tokio::test]
async fn test_follow_edge_operations() {
    let (db, _temp_dir) = create_test_db().await;
    let accounts = create_accounts(&db, &["alice", "bob"]).await;
    let (alice, bob) = (&accounts[0], &accounts[1]);

    assert!(db.insert_follow_if_absent(&alice.id, &bob.id).await.unwrap());
    // Second insert is a no-op
    assert!(!db.insert_follow_if_absent(&alice.id, &bob.id).await.unwrap());

    assert!(db.follow_exists(&alice.id, &bob.id).await.unwrap());
    assert!(!db.follow_exists(&bob.id, &alice.id).await.unwrap());

    assert!(db.delete_follow(&alice.id, &bob.id).await.unwrap());
    assert!(!db.delete_follow(&alice.id, &bob.id).await.unwrap());
    assert!(!db.follow_exists(&alice.id, &bob.id).await.unwrap());
}

#[tokio::test]
async fn test_messaging_settings_default_creation() {
    let (db, _temp_dir) = create_test_db().await;
    let accounts = create_accounts(&db, &["alice"]).await;

    let settings = db.ensure_messaging_settings(&accounts[0].id).await.unwrap();
    assert_eq!(settings.policy, "everyone");

    let updated = db
        .update_messaging_settings(&accounts[0].id, MessagingPolicy::Mutual)
        .await
        .unwrap();
    assert_eq!(updated.policy, "mutual");

    // ensure does not overwrite an explicit choice
    let settings = db.ensure_messaging_settings(&accounts[0].id).await.unwrap();
    assert_eq!(settings.policy, "mutual");
}

#[tokio::test]
async fn test_dm_conversation_is_unique_per_pair() {
    let (db, _temp_dir) = create_test_db().await;
    let accounts = create_accounts(&db, &["alice", "bob"]).await;
    let (alice, bob) = (&accounts[0], &accounts[1]);

    let conversation = db
        .create_dm_conversation(&alice.id, &bob.id, false)
        .await
        .unwrap();

    // Creating again (even with roles swapped) returns the same conversation
    let again = db
        .create_dm_conversation(&bob.id, &alice.id, true)
        .await
        .unwrap();
    assert_eq!(conversation.id, again.id);

    let found = db
        .find_dm_conversation(&bob.id, &alice.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, conversation.id);

    let participants = db.get_participants(&conversation.id).await.unwrap();
    assert_eq!(participants.len(), 2);
}

#[tokio::test]
async fn test_dm_conversation_participant_sides() {
    let (db, _temp_dir) = create_test_db().await;
    let accounts = create_accounts(&db, &["alice", "bob"]).await;
    let (alice, bob) = (&accounts[0], &accounts[1]);

    let conversation = db
        .create_dm_conversation(&alice.id, &bob.id, true)
        .await
        .unwrap();

    let sender_side = db
        .get_participant(&conversation.id, &alice.id)
        .await
        .unwrap()
        .unwrap();
    assert!(!sender_side.is_request);
    assert!(sender_side.request_accepted);
    assert!(!sender_side.has_active_request());

    let receiver_side = db
        .get_participant(&conversation.id, &bob.id)
        .await
        .unwrap()
        .unwrap();
    assert!(receiver_side.is_request);
    assert!(!receiver_side.request_accepted);
    assert!(receiver_side.has_active_request());

    assert!(db
        .accept_participant_request(&conversation.id, &bob.id)
        .await
        .unwrap());
    // Accepting twice fails: no active request remains
    assert!(!db
        .accept_participant_request(&conversation.id, &bob.id)
        .await
        .unwrap());

    let receiver_side = db
        .get_participant(&conversation.id, &bob.id)
        .await
        .unwrap()
        .unwrap();
    assert!(!receiver_side.has_active_request());
}

#[tokio::test]
async fn test_message_crud_and_pagination() {
    let (db, _temp_dir) = create_test_db().await;
    let accounts = create_accounts(&db, &["alice", "bob"]).await;
    let (alice, bob) = (&accounts[0], &accounts[1]);

    let conversation = db
        .create_dm_conversation(&alice.id, &bob.id, false)
        .await
        .unwrap();

    let mut ids = Vec::new();
    for i in 0..5 {
        let message = test_message(&conversation.id, &alice.id, &format!("message {}", i));
        db.insert_message(&message).await.unwrap();
        ids.push(message.id);
        // ULIDs only order across millisecond boundaries
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }

    // Newest first
    let page = db
        .list_messages(&conversation.id, 2, None, None)
        .await
        .unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].content, "message 4");

    // max_id pages backwards
    let older = db
        .list_messages(&conversation.id, 10, Some(&page[1].id), None)
        .await
        .unwrap();
    assert_eq!(older.len(), 3);
    assert_eq!(older[0].content, "message 2");

    // since_id pages forwards
    let newer = db
        .list_messages(&conversation.id, 10, None, Some(&ids[3]))
        .await
        .unwrap();
    assert_eq!(newer.len(), 1);
    assert_eq!(newer[0].content, "message 4");

    // Edit: only by sender, tombstones excluded
    assert!(db
        .update_message_content(&ids[0], &alice.id, "edited", Utc::now())
        .await
        .unwrap());
    assert!(!db
        .update_message_content(&ids[0], &bob.id, "hijack", Utc::now())
        .await
        .unwrap());
    let edited = db.get_message(&ids[0]).await.unwrap().unwrap();
    assert!(edited.is_edited);
    assert_eq!(edited.content, "edited");

    // Soft delete leaves a tombstone
    assert!(db.soft_delete_message(&ids[0], &alice.id).await.unwrap());
    let tombstone = db.get_message(&ids[0]).await.unwrap().unwrap();
    assert!(tombstone.is_deleted);
    assert_eq!(tombstone.content, "");
    assert!(!db
        .update_message_content(&ids[0], &alice.id, "revive", Utc::now())
        .await
        .unwrap());
}

#[tokio::test]
async fn test_unread_counting() {
    let (db, _temp_dir) = create_test_db().await;
    let accounts = create_accounts(&db, &["alice", "bob"]).await;
    let (alice, bob) = (&accounts[0], &accounts[1]);

    let conversation = db
        .create_dm_conversation(&alice.id, &bob.id, false)
        .await
        .unwrap();

    let base = Utc::now();
    for i in 0..3 {
        let mut message = test_message(&conversation.id, &alice.id, "from alice");
        message.created_at = base + Duration::seconds(i);
        db.insert_message(&message).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }
    let mut own = test_message(&conversation.id, &bob.id, "from bob");
    own.created_at = base + Duration::seconds(3);
    db.insert_message(&own).await.unwrap();

    // No last_read_at: all messages from others count, own do not
    let unread = db
        .count_unread_messages(&conversation.id, &bob.id, None)
        .await
        .unwrap();
    assert_eq!(unread, 3);

    // Reading up to the second message leaves one unread
    let unread = db
        .count_unread_messages(&conversation.id, &bob.id, Some(base + Duration::seconds(1)))
        .await
        .unwrap();
    assert_eq!(unread, 1);

    // Soft-deleted messages do not count
    let last = db.get_last_message(&conversation.id).await.unwrap().unwrap();
    assert_eq!(last.sender_id, bob.id);
    let page = db
        .list_messages(&conversation.id, 10, None, None)
        .await
        .unwrap();
    db.soft_delete_message(&page[1].id, &alice.id).await.unwrap();
    let unread = db
        .count_unread_messages(&conversation.id, &bob.id, None)
        .await
        .unwrap();
    assert_eq!(unread, 2);
}

#[tokio::test]
async fn test_conversation_listing_filters() {
    let (db, _temp_dir) = create_test_db().await;
    let accounts = create_accounts(&db, &["alice", "bob", "carol"]).await;
    let (alice, bob, carol) = (&accounts[0], &accounts[1], &accounts[2]);

    // bob -> alice as an accepted conversation
    let accepted = db
        .create_dm_conversation(&bob.id, &alice.id, false)
        .await
        .unwrap();
    // carol -> alice as a request
    let request = db
        .create_dm_conversation(&carol.id, &alice.id, true)
        .await
        .unwrap();

    let primary = db
        .list_conversations(&alice.id, ConversationFilter::Primary, 20)
        .await
        .unwrap();
    assert_eq!(primary.len(), 1);
    assert_eq!(primary[0].0.id, accepted.id);

    let requests = db
        .list_conversations(&alice.id, ConversationFilter::Requests, 20)
        .await
        .unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].0.id, request.id);

    // Accepting moves the request into the primary list
    db.accept_participant_request(&request.id, &alice.id)
        .await
        .unwrap();
    let primary = db
        .list_conversations(&alice.id, ConversationFilter::Primary, 20)
        .await
        .unwrap();
    assert_eq!(primary.len(), 2);

    // Archiving removes it from primary and shows it under archived
    db.set_participant_flag(&accepted.id, &alice.id, ParticipantFlag::Archived, true)
        .await
        .unwrap();
    let primary = db
        .list_conversations(&alice.id, ConversationFilter::Primary, 20)
        .await
        .unwrap();
    assert_eq!(primary.len(), 1);
    let archived = db
        .list_conversations(&alice.id, ConversationFilter::Archived, 20)
        .await
        .unwrap();
    assert_eq!(archived.len(), 1);
    assert_eq!(archived[0].0.id, accepted.id);
}

#[tokio::test]
async fn test_delete_conversation_cascades() {
    let (db, _temp_dir) = create_test_db().await;
    let accounts = create_accounts(&db, &["alice", "bob"]).await;
    let (alice, bob) = (&accounts[0], &accounts[1]);

    let conversation = db
        .create_dm_conversation(&alice.id, &bob.id, true)
        .await
        .unwrap();
    db.insert_message(&test_message(&conversation.id, &alice.id, "hello"))
        .await
        .unwrap();

    assert!(db.delete_conversation(&conversation.id).await.unwrap());
    assert!(!db.delete_conversation(&conversation.id).await.unwrap());

    assert!(db
        .get_participant(&conversation.id, &alice.id)
        .await
        .unwrap()
        .is_none());
    let messages = db
        .list_messages(&conversation.id, 10, None, None)
        .await
        .unwrap();
    assert!(messages.is_empty());

    // The pair can start over after deletion
    let fresh = db
        .create_dm_conversation(&alice.id, &bob.id, false)
        .await
        .unwrap();
    assert_ne!(fresh.id, conversation.id);
}

#[tokio::test]
async fn test_access_token_round_trip() {
    let (db, _temp_dir) = create_test_db().await;
    let accounts = create_accounts(&db, &["alice"]).await;

    let stored = db
        .insert_access_token(&accounts[0].id, "plaintext-token")
        .await
        .unwrap();
    // Plaintext is never stored
    assert_ne!(stored.access_token, "plaintext-token");
    assert!(stored.access_token.starts_with("sha256:"));

    let resolved = db
        .get_account_by_token("plaintext-token")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(resolved.id, accounts[0].id);

    assert!(db.get_account_by_token("wrong-token").await.unwrap().is_none());

    assert!(db.revoke_access_token("plaintext-token").await.unwrap());
    assert!(db
        .get_account_by_token("plaintext-token")
        .await
        .unwrap()
        .is_none());
}
