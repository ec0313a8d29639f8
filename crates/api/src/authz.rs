//! API-side authorization bridge.
//!
//! Resolves the request identity into a [`Principal`] with permissions read
//! fresh from the store, then runs the resource rules from `fitshop-auth`
//! before anything is mutated.

use fitshop_auth::{AuthzError, Principal};
use fitshop_infra::Store;

use crate::context::Identity;
use crate::error::{ApiError, ApiResult};

/// Load the principal behind `identity`.
///
/// A correctly signed credential whose user no longer exists is treated the
/// same as a credential that fails verification.
pub async fn resolve_principal(store: &dyn Store, identity: &Identity) -> ApiResult<Principal> {
    let user_id = identity.require()?;
    match store.user(user_id).await? {
        Some(user) => Ok(user.principal()),
        None => {
            tracing::warn!(user_id = %user_id, "credential names an unknown user");
            Err(ApiError::InvalidCredential)
        }
    }
}

/// Turn a rule outcome into an operation result, logging denials.
pub fn enforce(principal: &Principal, outcome: Result<(), AuthzError>) -> ApiResult<()> {
    outcome.map_err(|err| {
        tracing::warn!(user_id = %principal.id(), reason = %err, "permission denied");
        ApiError::from(err)
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use fitshop_auth::{CredentialError, NewUser, Permission, PermissionSet, authorize_update_permissions};
    use fitshop_core::{Email, UserId};
    use fitshop_infra::InMemoryStore;

    use super::*;

    #[tokio::test]
    async fn anonymous_and_rejected_identities_fail_differently() {
        let store = InMemoryStore::new();
        assert_eq!(
            resolve_principal(&store, &Identity::Anonymous).await,
            Err(ApiError::Unauthenticated)
        );
        assert_eq!(
            resolve_principal(&store, &Identity::Rejected(CredentialError::BadSignature)).await,
            Err(ApiError::InvalidCredential)
        );
    }

    #[tokio::test]
    async fn unknown_user_is_an_invalid_credential() {
        let store = InMemoryStore::new();
        let identity = Identity::User(UserId::new());
        assert_eq!(
            resolve_principal(&store, &identity).await,
            Err(ApiError::InvalidCredential)
        );
    }

    #[tokio::test]
    async fn permissions_come_from_the_store() {
        let store = InMemoryStore::new();
        let user = NewUser::new(Email::parse("a@x.com").unwrap(), "A", "hash".into())
            .unwrap()
            .into_user(Utc::now());
        let id = user.id;
        store.insert_user(user).await.unwrap();
        store
            .replace_permissions(id, PermissionSet::from_iter([Permission::Admin]))
            .await
            .unwrap();

        let principal = resolve_principal(&store, &Identity::User(id)).await.unwrap();
        assert!(principal.permissions().contains(Permission::Admin));
        assert!(!principal.permissions().contains(Permission::User));
        assert_eq!(enforce(&principal, authorize_update_permissions(&principal)), Ok(()));
    }

    #[test]
    fn denials_become_permission_denied() {
        let principal = Principal::new(UserId::new(), PermissionSet::signup_default());
        let err = enforce(&principal, authorize_update_permissions(&principal)).unwrap_err();
        assert!(matches!(err, ApiError::PermissionDenied(_)));
    }
}
