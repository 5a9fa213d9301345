//! Universal properties from spec.md §8, checked over arbitrary inputs
//! with `proptest` rather than fixed examples:
//!
//! - P1 (scope implication is monotone): if `Verify` grants a stronger
//!   scope, it grants every weaker one too.
//! - P2 (hierarchy is monotone): an organization-level grant is inherited
//!   by every resource under it, at the same scope.
//!
//! These only need the pure decision function in `tvm::authz::resolver`,
//! not a database — `decide()` takes grants and an ancestor chain as plain
//! values.

use proptest::prelude::*;
use tvm::authz::decide;
use tvm::domain::{EntityScope, EntityType, Scope};

fn arb_scope() -> impl Strategy<Value = Scope> {
    prop_oneof![Just(Scope::Read), Just(Scope::Write), Just(Scope::Admin)]
}

proptest! {
    #[test]
    fn p1_implication_is_monotone(
        held in arb_scope(),
        requested_stronger in arb_scope(),
        requested_weaker in arb_scope(),
        entity_id in 1i64..1000,
    ) {
        prop_assume!(requested_weaker <= requested_stronger);

        let grants = vec![EntityScope::new(EntityType::Resource, entity_id, held)];
        let stronger_target = EntityScope::new(EntityType::Resource, entity_id, requested_stronger);
        let weaker_target = EntityScope::new(EntityType::Resource, entity_id, requested_weaker);

        if decide(&grants, stronger_target, &[]) {
            prop_assert!(decide(&grants, weaker_target, &[]));
        }
    }

    #[test]
    fn p2_hierarchy_is_monotone(
        scope in arb_scope(),
        org_id in 1i64..1000,
        workspace_id in 1i64..1000,
        resource_id in 1i64..1000,
    ) {
        let grants = vec![EntityScope::new(EntityType::Organization, org_id, scope)];
        let chain = [
            (EntityType::Workspace, workspace_id),
            (EntityType::Organization, org_id),
            (EntityType::System, 0),
        ];

        let target = EntityScope::new(EntityType::Resource, resource_id, scope);
        prop_assert!(decide(&grants, target, &chain));
    }

    #[test]
    fn unrelated_organization_grant_never_satisfies_a_different_organizations_resource(
        scope in arb_scope(),
        granted_org in 1i64..1000,
        actual_org in 1i64..1000,
        workspace_id in 1i64..1000,
        resource_id in 1i64..1000,
    ) {
        prop_assume!(granted_org != actual_org);

        let grants = vec![EntityScope::new(EntityType::Organization, granted_org, scope)];
        let chain = [
            (EntityType::Workspace, workspace_id),
            (EntityType::Organization, actual_org),
            (EntityType::System, 0),
        ];

        let target = EntityScope::new(EntityType::Resource, resource_id, scope);
        prop_assert!(!decide(&grants, target, &chain));
    }
}
