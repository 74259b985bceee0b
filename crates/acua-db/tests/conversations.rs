use chrono::{Duration, Utc};
use uuid::Uuid;

use acua_db::{Database, StoreError};
use acua_types::models::NotificationKind;
use acua_types::payload::MessagePayload;

fn db() -> Database {
    Database::open_in_memory().expect("in-memory database")
}

#[test]
fn find_or_create_is_order_independent() {
    let db = db();
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let now = Utc::now();

    let (first, created) = db.find_or_create_conversation(a, b, now).unwrap();
    assert!(created);
    let (again, created_again) = db.find_or_create_conversation(b, a, now).unwrap();
    assert!(!created_again);
    let (third, _) = db.find_or_create_conversation(a, b, now).unwrap();

    assert_eq!(first.id, again.id);
    assert_eq!(first.id, third.id);
    assert_eq!(db.list_conversations(a).unwrap().len(), 1);
}

#[test]
fn new_conversation_has_zeroed_counters_and_snapshots() {
    let db = db();
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let now = Utc::now();
    db.upsert_profile(a, "Granja El Lago", Some("https://img/a.png"), now).unwrap();

    let (conv, _) = db.find_or_create_conversation(a, b, now).unwrap();

    assert!(conv.last_message.is_none());
    assert_eq!(conv.unread_counts.len(), 2);
    assert_eq!(conv.unread_for(a), 0);
    assert_eq!(conv.unread_for(b), 0);
    assert_eq!(conv.participant(a).unwrap().display_name, "Granja El Lago");
    assert_eq!(conv.participant(b).unwrap().display_name, "Usuario");
}

#[test]
fn snapshots_are_not_refreshed() {
    let db = db();
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let now = Utc::now();
    db.upsert_profile(a, "Antes", None, now).unwrap();
    let (conv, _) = db.find_or_create_conversation(a, b, now).unwrap();

    db.upsert_profile(a, "Después", None, now).unwrap();
    let conv = db.get_conversation(conv.id, b).unwrap();
    assert_eq!(conv.participant(a).unwrap().display_name, "Antes");
}

#[test]
fn self_conversation_rejected() {
    let db = db();
    let a = Uuid::new_v4();
    assert!(matches!(
        db.find_or_create_conversation(a, a, Utc::now()),
        Err(StoreError::SelfConversation)
    ));
}

#[test]
fn append_bumps_only_the_recipient() {
    let db = db();
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let now = Utc::now();
    let (conv, _) = db.find_or_create_conversation(a, b, now).unwrap();

    let (_, after) = db
        .append_message(conv.id, a, &MessagePayload::text("hi"), now)
        .unwrap();
    assert_eq!(after.unread_for(b), 1);
    assert_eq!(after.unread_for(a), 0);

    let (_, after) = db
        .append_message(conv.id, a, &MessagePayload::text("otra vez"), now)
        .unwrap();
    assert_eq!(after.unread_for(b), 2);
    assert_eq!(after.unread_for(a), 0);

    let last = after.last_message.unwrap();
    assert_eq!(last.text, "otra vez");
    assert_eq!(last.sender_id, a);
}

#[test]
fn mark_read_resets_and_is_idempotent() {
    let db = db();
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let now = Utc::now();
    let (conv, _) = db.find_or_create_conversation(a, b, now).unwrap();
    for text in ["uno", "dos", "tres"] {
        db.append_message(conv.id, a, &MessagePayload::text(text), now).unwrap();
    }
    db.append_message(conv.id, b, &MessagePayload::text("ok"), now).unwrap();

    let read = db.mark_conversation_read(conv.id, b).unwrap();
    assert_eq!(read.unread_for(b), 0);
    assert_eq!(read.unread_for(a), 1);

    let again = db.mark_conversation_read(conv.id, b).unwrap();
    assert_eq!(again.unread_for(b), 0);
    assert_eq!(db.total_unread(b).unwrap(), 0);
    assert_eq!(db.total_unread(a).unwrap(), 1);
}

#[test]
fn outsiders_cannot_touch_a_conversation() {
    let db = db();
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let stranger = Uuid::new_v4();
    let now = Utc::now();
    let (conv, _) = db.find_or_create_conversation(a, b, now).unwrap();

    assert!(matches!(
        db.append_message(conv.id, stranger, &MessagePayload::text("hola"), now),
        Err(StoreError::NotParticipant)
    ));
    assert!(matches!(
        db.list_messages(conv.id, stranger, 50, None),
        Err(StoreError::NotParticipant)
    ));
    assert!(matches!(
        db.mark_conversation_read(conv.id, stranger),
        Err(StoreError::NotParticipant)
    ));
    assert!(matches!(
        db.get_conversation(Uuid::new_v4(), a),
        Err(StoreError::NotFound(_))
    ));
}

#[test]
fn empty_text_is_rejected() {
    let db = db();
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let (conv, _) = db.find_or_create_conversation(a, b, Utc::now()).unwrap();

    assert!(matches!(
        db.append_message(conv.id, a, &MessagePayload::text("  "), Utc::now()),
        Err(StoreError::InvalidInput(_))
    ));
}

#[test]
fn messages_come_back_in_time_order_and_page_backwards() {
    let db = db();
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let start = Utc::now();
    let (conv, _) = db.find_or_create_conversation(a, b, start).unwrap();

    // Written out of order on purpose
    for minute in [3, 1, 4, 2, 5] {
        let sender = if minute % 2 == 0 { a } else { b };
        db.append_message(
            conv.id,
            sender,
            &MessagePayload::text(format!("m{minute}")),
            start + Duration::minutes(minute),
        )
        .unwrap();
    }

    let all = db.list_messages(conv.id, a, 50, None).unwrap();
    let texts: Vec<String> = all.iter().map(|m| m.payload.summary()).collect();
    assert_eq!(texts, vec!["m1", "m2", "m3", "m4", "m5"]);

    let latest = db.list_messages(conv.id, a, 2, None).unwrap();
    let texts: Vec<String> = latest.iter().map(|m| m.payload.summary()).collect();
    assert_eq!(texts, vec!["m4", "m5"]);

    let older = db
        .list_messages(conv.id, a, 2, Some(latest[0].id))
        .unwrap();
    let texts: Vec<String> = older.iter().map(|m| m.payload.summary()).collect();
    assert_eq!(texts, vec!["m2", "m3"]);
}

#[test]
fn paging_does_not_skip_messages_sharing_a_timestamp() {
    let db = db();
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let now = Utc::now();
    let (conv, _) = db.find_or_create_conversation(a, b, now).unwrap();

    for text in ["m1", "m2", "m3"] {
        db.append_message(conv.id, a, &MessagePayload::text(text), now).unwrap();
    }

    let latest = db.list_messages(conv.id, b, 2, None).unwrap();
    let texts: Vec<String> = latest.iter().map(|m| m.payload.summary()).collect();
    assert_eq!(texts, vec!["m2", "m3"]);

    let older = db.list_messages(conv.id, b, 2, Some(latest[0].id)).unwrap();
    let texts: Vec<String> = older.iter().map(|m| m.payload.summary()).collect();
    assert_eq!(texts, vec!["m1"]);
}

#[test]
fn cursor_from_another_conversation_is_rejected() {
    let db = db();
    let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let now = Utc::now();
    let (ab, _) = db.find_or_create_conversation(a, b, now).unwrap();
    let (ac, _) = db.find_or_create_conversation(a, c, now).unwrap();
    let (elsewhere, _) = db.append_message(ac.id, a, &MessagePayload::text("hola"), now).unwrap();

    assert!(matches!(
        db.list_messages(ab.id, a, 10, Some(elsewhere.id)),
        Err(StoreError::NotFound("message"))
    ));
}

#[test]
fn cards_are_stored_as_tagged_payloads() {
    let db = db();
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let now = Utc::now();
    let (conv, _) = db.find_or_create_conversation(a, b, now).unwrap();
    let card = MessagePayload::ProductCard {
        product_id: Uuid::new_v4(),
        title: "Concentrado 32%".into(),
        price: Some(98_000.0),
        image_url: None,
    };

    let (_, after) = db.append_message(conv.id, a, &card, now).unwrap();
    assert_eq!(after.last_message.unwrap().text, "🛒 Concentrado 32%");

    let stored = db.list_messages(conv.id, b, 10, None).unwrap();
    assert_eq!(stored[0].payload, card);
}

#[test]
fn first_message_end_to_end() {
    let db = db();
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let now = Utc::now();
    db.upsert_profile(a, "Ana", None, now).unwrap();

    let (conv, created) = db.find_or_create_conversation(a, b, now).unwrap();
    assert!(created);

    let sent = db
        .send_message(conv.id, a, &MessagePayload::text("Hola"), now)
        .unwrap();

    assert_eq!(db.list_conversations(a).unwrap().len(), 1);
    assert_eq!(db.list_conversations(b).unwrap().len(), 1);
    assert_eq!(db.list_messages(conv.id, b, 50, None).unwrap().len(), 1);
    assert_eq!(sent.conversation.unread_for(a), 0);
    assert_eq!(sent.conversation.unread_for(b), 1);

    let notification = sent.notification.expect("recipient is notified");
    assert_eq!(notification.recipient_id, b);
    assert_eq!(notification.kind, NotificationKind::NewMessage);
    assert_eq!(notification.body, "Hola");
    assert_eq!(notification.sender.display_name, "Ana");

    let inbox = db.list_notifications(b, false, 50).unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].kind, NotificationKind::NewMessage);
    assert!(db.list_notifications(a, false, 50).unwrap().is_empty());
}

#[test]
fn list_orders_by_latest_activity() {
    let db = db();
    let me = Uuid::new_v4();
    let x = Uuid::new_v4();
    let y = Uuid::new_v4();
    let start = Utc::now();

    let (with_x, _) = db.find_or_create_conversation(me, x, start).unwrap();
    let (with_y, _) = db
        .find_or_create_conversation(me, y, start + Duration::seconds(1))
        .unwrap();
    assert_eq!(db.list_conversations(me).unwrap()[0].id, with_y.id);

    db.append_message(with_x.id, x, &MessagePayload::text("arriba"), start + Duration::seconds(2))
        .unwrap();
    assert_eq!(db.list_conversations(me).unwrap()[0].id, with_x.id);
}
