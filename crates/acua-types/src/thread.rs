use std::collections::{HashMap, HashSet};

use serde::Serialize;
use uuid::Uuid;

use crate::models::Comment;

/// A comment together with its replies, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentNode {
    #[serde(flatten)]
    pub comment: Comment,
    pub replies: Vec<CommentNode>,
}

pub struct CommentThread;

impl CommentThread {
    /// Rebuilds the reply tree from a flat list of comments on one target.
    /// Comments whose parent is not in the list are promoted to roots.
    pub fn build(mut comments: Vec<Comment>) -> Vec<CommentNode> {
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        let ids: HashSet<Uuid> = comments.iter().map(|c| c.id).collect();
        let mut roots = Vec::new();
        let mut children: HashMap<Uuid, Vec<Comment>> = HashMap::new();

        for comment in comments {
            match comment.parent_id {
                Some(parent) if parent != comment.id && ids.contains(&parent) => {
                    children.entry(parent).or_default().push(comment);
                }
                _ => roots.push(comment),
            }
        }

        roots
            .into_iter()
            .map(|c| attach(c, &mut children))
            .collect()
    }
}

fn attach(comment: Comment, children: &mut HashMap<Uuid, Vec<Comment>>) -> CommentNode {
    let replies = children
        .remove(&comment.id)
        .unwrap_or_default()
        .into_iter()
        .map(|c| attach(c, children))
        .collect();
    CommentNode { comment, replies }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CommentTarget;
    use chrono::{Duration, Utc};

    fn comment(id: u128, parent: Option<u128>, minute: i64) -> Comment {
        Comment {
            id: Uuid::from_u128(id),
            target: CommentTarget::Post(Uuid::nil()),
            author_id: Uuid::nil(),
            author_name: "x".into(),
            parent_id: parent.map(Uuid::from_u128),
            body: format!("c{id}"),
            created_at: Utc::now() + Duration::minutes(minute),
        }
    }

    #[test]
    fn nests_replies_in_time_order() {
        let flat = vec![
            comment(3, Some(1), 3),
            comment(1, None, 1),
            comment(2, None, 2),
            comment(4, Some(1), 4),
            comment(5, Some(3), 5),
        ];

        let tree = CommentThread::build(flat);
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].comment.id, Uuid::from_u128(1));
        let replies: Vec<Uuid> = tree[0].replies.iter().map(|n| n.comment.id).collect();
        assert_eq!(replies, vec![Uuid::from_u128(3), Uuid::from_u128(4)]);
        assert_eq!(tree[0].replies[0].replies[0].comment.id, Uuid::from_u128(5));
        assert!(tree[1].replies.is_empty());
    }

    #[test]
    fn orphans_become_roots() {
        let tree = CommentThread::build(vec![comment(7, Some(99), 0)]);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].comment.id, Uuid::from_u128(7));
    }
}
