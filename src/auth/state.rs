//! Authentication state trait and macro.

use super::service::AuthService;

/// Trait for state types that hand out the auth service to extractors.
pub trait HasAuthService {
    fn auth(&self) -> &AuthService;
}

/// Macro to implement `HasAuthService` for state structs with an `auth: AuthService` field.
///
/// # Example
/// ```ignore
/// use crate::impl_has_auth_service;
///
/// #[derive(Clone)]
/// pub struct MyState {
///     pub auth: AuthService,
///     // ... other fields
/// }
///
/// impl_has_auth_service!(MyState);
/// ```
#[macro_export]
macro_rules! impl_has_auth_service {
    ($state_type:ty) => {
        impl $crate::auth::HasAuthService for $state_type {
            fn auth(&self) -> &$crate::auth::AuthService {
                &self.auth
            }
        }
    };
}
