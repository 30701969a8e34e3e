//! Tenant scoping of reads and mutations.
//!
//! Role policy answers "may this role do this at all"; the functions here answer "on which
//! company's data". They run after [`crate::auth::policy::authorize`] has allowed the operation.

use crate::{
    auth::{current_user::Principal, policy::Decision},
    types::{CompanyId, Role},
};

/// The set of companies a principal may read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantScope {
    /// Every company
    Unrestricted,
    /// One company only
    RestrictedTo(CompanyId),
    /// No company at all. Only reachable when a non-superadmin account has no company, which the
    /// schema forbids.
    Empty,
}

pub fn scope(principal: &Principal) -> TenantScope {
    match (principal.role, principal.company_id) {
        (Role::Superadmin, _) => TenantScope::Unrestricted,
        (_, Some(company_id)) => TenantScope::RestrictedTo(company_id),
        (_, None) => TenantScope::Empty,
    }
}

/// May `principal` edit or delete an account belonging to `target_company_id`?
pub fn can_mutate(principal: &Principal, target_company_id: Option<CompanyId>) -> Decision {
    if principal.role == Role::Superadmin {
        return Decision::Allow;
    }

    match (principal.company_id, target_company_id) {
        (Some(own), Some(target)) if own == target => Decision::Allow,
        _ => Decision::Deny,
    }
}

/// Company a new account is created in. Only a superadmin chooses; everyone else creates inside
/// their own company whatever the request says.
pub fn effective_company_id(principal: &Principal, supplied: Option<CompanyId>) -> Option<CompanyId> {
    match principal.role {
        Role::Superadmin => supplied,
        _ => principal.company_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(role: Role, company_id: Option<CompanyId>) -> Principal {
        Principal { id: 1, role, company_id }
    }

    #[test]
    fn test_scope_by_role() {
        assert_eq!(scope(&principal(Role::Superadmin, None)), TenantScope::Unrestricted);
        assert_eq!(scope(&principal(Role::Manager, Some(5))), TenantScope::RestrictedTo(5));
        assert_eq!(scope(&principal(Role::Employee, Some(7))), TenantScope::RestrictedTo(7));
    }

    #[test]
    fn test_companyless_non_superadmin_sees_nothing() {
        let orphan = principal(Role::Manager, None);
        assert_eq!(scope(&orphan), TenantScope::Empty);
    }

    #[test]
    fn test_can_mutate_same_company_only() {
        for role in [Role::Manager, Role::Employee] {
            let p = principal(role, Some(5));
            assert_eq!(can_mutate(&p, Some(5)), Decision::Allow);
            assert_eq!(can_mutate(&p, Some(7)), Decision::Deny, "{role} crossing tenants");
            assert_eq!(can_mutate(&p, None), Decision::Deny);
        }
    }

    #[test]
    fn test_can_mutate_null_company_never_matches() {
        let orphan = principal(Role::Manager, None);
        assert_eq!(can_mutate(&orphan, None), Decision::Deny);
        assert_eq!(can_mutate(&orphan, Some(5)), Decision::Deny);
    }

    #[test]
    fn test_superadmin_mutates_anywhere() {
        let root = principal(Role::Superadmin, None);
        assert_eq!(can_mutate(&root, Some(5)), Decision::Allow);
        assert_eq!(can_mutate(&root, None), Decision::Allow);
    }

    #[test]
    fn test_effective_company_id_override() {
        assert_eq!(effective_company_id(&principal(Role::Manager, Some(5)), Some(7)), Some(5));
        assert_eq!(effective_company_id(&principal(Role::Manager, Some(5)), None), Some(5));
        assert_eq!(effective_company_id(&principal(Role::Superadmin, None), Some(7)), Some(7));
        assert_eq!(effective_company_id(&principal(Role::Superadmin, None), None), None);
    }
}
