use crate::core::RecordStore;
use crate::domain::model::{Filter, Operator, Role, SelectQuery, Table, UserProfile};
use crate::utils::error::{HsseError, Result};

/// Looks up the operator's profile role. A missing profile counts as a plain user.
pub async fn is_admin<R: RecordStore + ?Sized>(store: &R, operator: &Operator) -> Result<bool> {
    let query = SelectQuery::all()
        .columns("role")
        .filter(Filter::Eq("id".to_string(), operator.id.clone()));
    let rows = store.select(Table::UsersProfile, &query).await?;
    Ok(rows.first().and_then(|r| r.str_field("role")) == Some("admin"))
}

pub(crate) async fn require_admin<R: RecordStore + ?Sized>(store: &R, operator: &Operator) -> Result<()> {
    if is_admin(store, operator).await? {
        Ok(())
    } else {
        tracing::warn!("Operator {} attempted an admin action", operator.id);
        Err(HsseError::PermissionError {
            message: "Only administrators can do this".to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UserStats {
    pub total: usize,
    pub admins: usize,
    pub active: usize,
}

impl UserStats {
    pub fn from_profiles(profiles: &[UserProfile]) -> Self {
        Self {
            total: profiles.len(),
            admins: profiles.iter().filter(|p| p.role == Role::Admin).count(),
            active: profiles.iter().filter(|p| p.is_active).count(),
        }
    }
}

/// User management for an operator already verified as admin.
pub struct UserAdmin<'a, R: RecordStore + ?Sized> {
    store: &'a R,
}

impl<'a, R: RecordStore + ?Sized> UserAdmin<'a, R> {
    pub async fn for_operator(store: &'a R, operator: &Operator) -> Result<Self> {
        require_admin(store, operator).await?;
        Ok(Self { store })
    }

    /// All profiles, oldest first.
    pub async fn list_users(&self) -> Result<Vec<UserProfile>> {
        let query = SelectQuery::all().order_by("created_at", true);
        let rows = self.store.select(Table::UsersProfile, &query).await?;
        rows.into_iter()
            .map(|r| serde_json::from_value(serde_json::Value::Object(r.data)).map_err(HsseError::from))
            .collect()
    }

    async fn profile(&self, user_id: &str) -> Result<UserProfile> {
        let query = SelectQuery::all().filter(Filter::Eq("id".to_string(), user_id.to_string()));
        let row = self
            .store
            .select(Table::UsersProfile, &query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| HsseError::ProcessingError {
                message: format!("No user with id {}", user_id),
            })?;
        Ok(serde_json::from_value(serde_json::Value::Object(row.data))?)
    }

    pub async fn toggle_role(&self, user_id: &str) -> Result<Role> {
        let new_role = self.profile(user_id).await?.role.toggled();
        self.store
            .update(Table::UsersProfile, user_id, serde_json::json!({ "role": new_role }))
            .await?;
        tracing::info!("User role updated to {:?} for {}", new_role, user_id);
        Ok(new_role)
    }

    pub async fn toggle_active(&self, user_id: &str) -> Result<bool> {
        let active = !self.profile(user_id).await?.is_active;
        self.store
            .update(Table::UsersProfile, user_id, serde_json::json!({ "is_active": active }))
            .await?;
        tracing::info!(
            "User {} {}",
            user_id,
            if active { "activated" } else { "deactivated" }
        );
        Ok(active)
    }

    /// Removes the profile row only; the auth account is managed elsewhere.
    pub async fn delete_user(&self, user_id: &str) -> Result<()> {
        self.store
            .delete(Table::UsersProfile, &[user_id.to_string()])
            .await?;
        tracing::info!("User {} deleted", user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_profile_defaults_and_stats() {
        let profiles: Vec<UserProfile> = vec![
            serde_json::from_value(json!({"id": "a", "role": "admin"})).unwrap(),
            serde_json::from_value(json!({"id": "b", "is_active": false})).unwrap(),
            serde_json::from_value(json!({"id": "c", "full_name": "Tera"})).unwrap(),
        ];
        assert_eq!(profiles[1].role, Role::User);
        assert_eq!(
            UserStats::from_profiles(&profiles),
            UserStats {
                total: 3,
                admins: 1,
                active: 2
            }
        );
    }
}
