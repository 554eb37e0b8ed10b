//! Replacement planning between two declared grants.
//!
//! There is no in-place update: any change becomes Remove(old), Apply(new).

use crate::spec::GrantSpec;
use crate::statement;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanStep {
    Remove(GrantSpec),
    Apply(GrantSpec),
}

impl PlanStep {
    /// Statements this step issues, in execution order.
    pub fn statements(&self) -> Vec<String> {
        match self {
            PlanStep::Remove(spec) => vec![
                statement::revoke_grant_option(spec),
                statement::revoke_privileges(spec),
            ],
            PlanStep::Apply(spec) => vec![
                statement::grant(spec),
                statement::show_grants(spec.user(), spec.host()),
            ],
        }
    }

    pub fn is_destructive(&self) -> bool {
        matches!(self, PlanStep::Remove(_))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    steps: Vec<PlanStep>,
}

impl Plan {
    pub fn between(old: Option<&GrantSpec>, new: Option<&GrantSpec>) -> Self {
        let steps = match (old, new) {
            (None, Some(new)) => vec![PlanStep::Apply(new.clone())],
            (Some(old), None) => vec![PlanStep::Remove(old.clone())],
            (Some(old), Some(new)) if old.requires_replacement(new) => vec![
                PlanStep::Remove(old.clone()),
                PlanStep::Apply(new.clone()),
            ],
            _ => Vec::new(),
        };
        tracing::debug!(steps = steps.len(), "planned grant changes");
        Self { steps }
    }

    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn statements(&self) -> Vec<String> {
        self.steps.iter().flat_map(PlanStep::statements).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(privileges: &[&str]) -> GrantSpec {
        GrantSpec::new("app", "appdb", privileges.iter().copied()).unwrap()
    }

    #[test]
    fn test_plan_create_and_destroy() {
        let s = spec(&["SELECT"]);
        let plan = Plan::between(None, Some(&s));
        assert_eq!(plan.steps(), &[PlanStep::Apply(s.clone())]);
        assert_eq!(
            plan.statements(),
            vec![
                "GRANT SELECT on `appdb`.* TO 'app'@'localhost'".to_string(),
                "SHOW GRANTS FOR 'app'@'localhost'".to_string(),
            ]
        );

        let plan = Plan::between(Some(&s), None);
        assert!(plan.steps()[0].is_destructive());
        assert_eq!(
            plan.statements(),
            vec![
                "REVOKE GRANT OPTION ON `appdb`.* FROM 'app'@'localhost'".to_string(),
                "REVOKE SELECT ON `appdb`.* FROM 'app'@'localhost'".to_string(),
            ]
        );
    }

    #[test]
    fn test_plan_unchanged_is_empty() {
        let s = spec(&["SELECT", "INSERT"]);
        let same = spec(&["INSERT", "SELECT"]);
        assert!(Plan::between(Some(&s), Some(&same)).is_empty());
        assert!(Plan::between(None, None).is_empty());
    }

    #[test]
    fn test_plan_change_is_replace() {
        let old = spec(&["SELECT"]);
        let new = old.clone().with_grant_option(true);
        let plan = Plan::between(Some(&old), Some(&new));
        assert_eq!(
            plan.steps(),
            &[PlanStep::Remove(old), PlanStep::Apply(new)]
        );
        assert_eq!(plan.statements().len(), 4);
    }
}
