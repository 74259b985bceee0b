use chrono::Utc;
use uuid::Uuid;

use acua_db::{Database, StoreError};
use acua_types::models::{CommentTarget, NewNotification, NotificationKind};
use acua_types::payload::MessagePayload;

fn db() -> Database {
    Database::open_in_memory().expect("in-memory database")
}

/// Makes every later notification insert fail.
fn drop_notifications_table(db: &Database) {
    db.with_conn(|conn| {
        conn.execute_batch("DROP TABLE notifications")?;
        Ok(())
    })
    .unwrap();
}

fn note(recipient_id: Uuid, sender_id: Uuid) -> NewNotification {
    NewNotification {
        recipient_id,
        sender_id,
        kind: NotificationKind::NewComment,
        title: "Nuevo comentario".into(),
        body: "¿Qué densidad de siembra usan para cachama?".into(),
        link: "/foro/1".into(),
    }
}

#[test]
fn self_notification_is_suppressed() {
    let db = db();
    let x = Uuid::new_v4();

    assert!(db.notify(note(x, x), Utc::now()).unwrap().is_none());
    assert!(db.list_notifications(x, false, 50).unwrap().is_empty());
}

#[test]
fn notification_starts_unread() {
    let db = db();
    let (x, y) = (Uuid::new_v4(), Uuid::new_v4());

    let created = db.notify(note(x, y), Utc::now()).unwrap().unwrap();
    assert!(!created.is_read);
    assert_eq!(created.sender.user_id, y);
    assert_eq!(db.unread_notification_count(x).unwrap(), 1);
}

#[test]
fn long_bodies_are_snipped() {
    let db = db();
    let (x, y) = (Uuid::new_v4(), Uuid::new_v4());
    let mut long = note(x, y);
    long.body = "á".repeat(150);

    let created = db.notify(long, Utc::now()).unwrap().unwrap();
    assert_eq!(created.body.chars().count(), 101);
    assert!(created.body.ends_with('…'));
}

#[test]
fn only_the_recipient_can_mark_read() {
    let db = db();
    let (x, y) = (Uuid::new_v4(), Uuid::new_v4());
    let created = db.notify(note(x, y), Utc::now()).unwrap().unwrap();

    assert!(matches!(
        db.mark_notification_read(created.id, y),
        Err(StoreError::NotFound(_))
    ));
    db.mark_notification_read(created.id, x).unwrap();
    db.mark_notification_read(created.id, x).unwrap();

    assert_eq!(db.unread_notification_count(x).unwrap(), 0);
    assert!(db.list_notifications(x, true, 50).unwrap().is_empty());
    assert_eq!(db.list_notifications(x, false, 50).unwrap().len(), 1);
}

#[test]
fn mark_all_read_touches_only_that_user() {
    let db = db();
    let (x, y, z) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let now = Utc::now();
    for _ in 0..3 {
        db.notify(note(x, y), now).unwrap();
    }
    db.notify(note(z, y), now).unwrap();

    assert_eq!(db.mark_all_notifications_read(x).unwrap(), 3);
    assert_eq!(db.mark_all_notifications_read(x).unwrap(), 0);
    assert_eq!(db.unread_notification_count(x).unwrap(), 0);
    assert_eq!(db.unread_notification_count(z).unwrap(), 1);
}

#[test]
fn failed_fanout_keeps_the_message_and_counter() {
    let db = db();
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let now = Utc::now();
    let (conv, _) = db.find_or_create_conversation(a, b, now).unwrap();
    drop_notifications_table(&db);

    let sent = db.send_message(conv.id, a, &MessagePayload::text("Hola"), now).unwrap();
    assert!(sent.notification.is_none());

    let stored = db.list_messages(conv.id, b, 50, None).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, sent.message.id);
    let conv = db.get_conversation(conv.id, b).unwrap();
    assert_eq!(conv.unread_for(b), 1);
    assert_eq!(conv.unread_for(a), 0);
    assert_eq!(conv.last_message.unwrap().text, "Hola");
}

#[test]
fn failed_fanout_keeps_the_comment() {
    let db = db();
    let (author, reader) = (Uuid::new_v4(), Uuid::new_v4());
    let now = Utc::now();
    let post = db.create_post(author, "Tilapia roja", "¿Proveedores?", None, now).unwrap();
    let target = CommentTarget::Post(post.id);
    drop_notifications_table(&db);

    let posted = db.post_comment(target, reader, None, "En Huila", now).unwrap();
    assert!(posted.notification.is_none());
    assert_eq!(db.list_comments(target).unwrap(), vec![posted.comment]);
}

#[test]
fn like_notification_names_the_liker_and_survives_failed_fanout() {
    let db = db();
    let (author, liker) = (Uuid::new_v4(), Uuid::new_v4());
    let now = Utc::now();
    db.upsert_profile(liker, "Luz", None, now).unwrap();
    let publication = db.create_publication(author, "Estanques", "En tierra", now).unwrap();

    let first = db.toggle_publication_like(publication.id, liker, now).unwrap();
    assert_eq!(first.notification.unwrap().title, "A Luz le gusta tu publicación");
    assert!(!db.toggle_publication_like(publication.id, liker, now).unwrap().liked);

    drop_notifications_table(&db);
    let again = db.toggle_publication_like(publication.id, liker, now).unwrap();
    assert!(again.liked);
    assert_eq!(again.like_count, 1);
    assert!(again.notification.is_none());
    assert_eq!(db.get_publication(publication.id).unwrap().unwrap().like_count, 1);
}
