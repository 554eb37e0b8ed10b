//! Apply / Verify / Remove for a single declared grant.
//!
//! Statements run one at a time over the caller's [`Connection`], with no
//! transaction, retry or rollback. A failed Remove can therefore leave the
//! grant option revoked while the privileges remain.

use crate::config::ReconcilerConfig;
use crate::connection::{Connection, Rows};
use crate::error::{ConnectionError, GrantError, Result, RevokeStage};
use crate::plan::{Plan, PlanStep};
use crate::spec::GrantSpec;
use crate::state::{GrantState, ResourceState};
use crate::statement;

/// Outcome of a SHOW GRANTS round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// The server answered; the grant is assumed to still hold.
    Confirmed,
    /// The server refused; the identity was cleared so the grant gets recreated.
    Drifted { cause: ConnectionError },
}

impl Verification {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Verification::Confirmed)
    }
}

#[derive(Debug, Clone, Default)]
pub struct GrantReconciler {
    config: ReconcilerConfig,
}

impl GrantReconciler {
    pub fn new(config: ReconcilerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    fn run<C: Connection + ?Sized>(conn: &C, sql: &str) -> std::result::Result<Rows, ConnectionError> {
        tracing::info!(statement = %sql, "executing statement");
        conn.execute(sql)
    }

    /// Issue the GRANT, record the identity, then confirm with [`Self::verify`].
    ///
    /// A failed GRANT records nothing. A failed confirmation is not an error:
    /// it clears the identity and is reported as [`Verification::Drifted`].
    pub fn apply<C, S>(&self, conn: &C, state: &mut S) -> Result<Verification>
    where
        C: Connection + ?Sized,
        S: ResourceState + ?Sized,
    {
        let sql = statement::grant(state.spec());
        Self::run(conn, &sql).map_err(|cause| GrantError::ApplyFailed { cause })?;

        let id = state.spec().identity();
        tracing::info!(identity = %id, "grant applied");
        state.set_identity(id);

        Ok(self.verify(conn, state))
    }

    /// Run SHOW GRANTS for the principal. Rows are not inspected.
    pub fn verify<C, S>(&self, conn: &C, state: &mut S) -> Verification
    where
        C: Connection + ?Sized,
        S: ResourceState + ?Sized,
    {
        let sql = statement::show_grants(state.spec().user(), state.spec().host());
        match Self::run(conn, &sql) {
            Ok(_) => Verification::Confirmed,
            Err(cause) => {
                tracing::warn!(
                    user = %state.spec().user(),
                    host = %state.spec().host(),
                    previous = ?state.identity().map(|id| id.as_str().to_string()),
                    error = %cause,
                    "grant drift detected, clearing identity"
                );
                state.clear_identity();
                Verification::Drifted { cause }
            }
        }
    }

    /// Revoke the grant option, then the privileges. Clears the identity once
    /// both statements succeed.
    pub fn remove<C, S>(&self, conn: &C, state: &mut S) -> Result<()>
    where
        C: Connection + ?Sized,
        S: ResourceState + ?Sized,
    {
        self.revoke(conn, state.spec())?;
        tracing::info!(identity = %state.spec().identity(), "grant removed");
        state.clear_identity();
        Ok(())
    }

    fn revoke<C: Connection + ?Sized>(&self, conn: &C, spec: &GrantSpec) -> Result<()> {
        let sql = statement::revoke_grant_option(spec);
        if let Err(cause) = Self::run(conn, &sql) {
            let tolerated = self.config.tolerate_missing_grant_option
                && !spec.grant_option()
                && cause.is_missing_grant();
            if !tolerated {
                return Err(GrantError::RevokeFailed {
                    stage: RevokeStage::GrantOption,
                    cause,
                });
            }
            tracing::warn!(
                identity = %spec.identity(),
                error = %cause,
                "grant option was never set, continuing with privilege revoke"
            );
        }

        let sql = statement::revoke_privileges(spec);
        Self::run(conn, &sql).map_err(|cause| GrantError::RevokeFailed {
            stage: RevokeStage::Privileges,
            cause,
        })?;
        Ok(())
    }

    /// Converge `state` onto `desired`.
    ///
    /// Identical specs only re-verify. Otherwise the old grant is removed and
    /// the new one applied; if Remove fails, `state` keeps the old spec.
    pub fn replace<C>(&self, conn: &C, state: &mut GrantState, desired: GrantSpec) -> Result<Verification>
    where
        C: Connection + ?Sized,
    {
        if !state.spec.requires_replacement(&desired) {
            return Ok(self.verify(conn, state));
        }
        if state.exists() {
            self.remove(conn, state)?;
        }
        *state = GrantState::new(desired);
        self.apply(conn, state)
    }

    /// Execute every step of `plan` in order and return the state of the grant
    /// it leaves behind, if any.
    pub fn execute_plan<C>(&self, conn: &C, plan: &Plan) -> Result<Option<GrantState>>
    where
        C: Connection + ?Sized,
    {
        let mut current = None;
        for step in plan.steps() {
            match step {
                PlanStep::Remove(spec) => {
                    self.revoke(conn, spec)?;
                    tracing::info!(identity = %spec.identity(), "grant removed");
                }
                PlanStep::Apply(spec) => {
                    let mut state = GrantState::new(spec.clone());
                    self.apply(conn, &mut state)?;
                    current = Some(state);
                }
            }
        }
        Ok(current)
    }
}
