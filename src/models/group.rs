use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Group {
    pub id: i32,
    pub name: String,
    pub creator_id: i32,
    /// Raw comma-separated allow-list, parsed on every access check.
    pub allowed_emails: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GroupSummary {
    pub id: i32,
    pub name: String,
    pub creator: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GroupDetailResponse {
    pub id: i32,
    pub name: String,
    pub creator: String,
    pub members: Vec<String>,
    pub tasks: Vec<GroupTaskResponse>,
    /// Extra-controls flag for the UI: creator or allow-listed by email.
    pub is_creator_or_allowed: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GroupTaskResponse {
    pub id: i32,
    pub title: String,
    pub priority: i32,
    pub completed: bool,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateGroupRequest {
    pub name: String,
    #[serde(default)]
    pub allowed_emails: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateGroupTaskRequest {
    pub title: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdatePriorityRequest {
    pub priority: i32,
}

/// Splits the free-text allow-list into normalized addresses: comma-separated,
/// trimmed, lowercased, empty entries dropped.
pub fn parse_allowed_emails(text: &str) -> Vec<String> {
    text.split(',')
        .map(|email| email.trim().to_lowercase())
        .filter(|email| !email.is_empty())
        .collect()
}

/// Access rule for a group: the creator, any explicit member, or anyone whose
/// email appears in the allow-list text.
pub fn user_has_access(
    user_id: i32,
    user_email: &str,
    creator_id: i32,
    member_ids: &[i32],
    allowed_emails: &str,
) -> bool {
    user_id == creator_id
        || member_ids.contains(&user_id)
        || parse_allowed_emails(allowed_emails).contains(&user_email.to_lowercase())
}

/// A visit by an allow-listed non-member promotes them into the member set.
pub fn should_promote_to_member(
    user_id: i32,
    user_email: &str,
    member_ids: &[i32],
    allowed_emails: &str,
) -> bool {
    !member_ids.contains(&user_id)
        && parse_allowed_emails(allowed_emails).contains(&user_email.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_list_is_trimmed_lowercased_and_compacted() {
        let parsed = parse_allowed_emails(" Alice@Example.com , bob@example.com ,, ,c@d.io");
        assert_eq!(parsed, vec!["alice@example.com", "bob@example.com", "c@d.io"]);
    }

    #[test]
    fn empty_allow_list_parses_to_nothing() {
        assert!(parse_allowed_emails("").is_empty());
        assert!(parse_allowed_emails("  ,  , ").is_empty());
    }

    #[test]
    fn creator_always_has_access() {
        assert!(user_has_access(7, "creator@example.com", 7, &[], ""));
    }

    #[test]
    fn member_has_access() {
        assert!(user_has_access(3, "member@example.com", 7, &[2, 3, 5], ""));
    }

    #[test]
    fn allow_listed_email_has_access_case_insensitively() {
        assert!(user_has_access(
            9,
            "Guest@Example.COM",
            7,
            &[2, 3],
            "other@x.io, guest@example.com"
        ));
    }

    #[test]
    fn outsider_has_no_access() {
        assert!(!user_has_access(9, "guest@example.com", 7, &[2, 3], "other@x.io"));
    }

    #[test]
    fn allow_listed_non_member_is_promoted() {
        assert!(should_promote_to_member(9, "guest@example.com", &[2, 3], "guest@example.com"));
    }

    #[test]
    fn promotion_is_idempotent_once_a_member() {
        assert!(!should_promote_to_member(9, "guest@example.com", &[2, 3, 9], "guest@example.com"));
    }

    #[test]
    fn creator_without_listing_is_not_promoted() {
        assert!(!should_promote_to_member(7, "creator@example.com", &[], ""));
    }
}
