//! The confidential survey core: submission gate, aggregation engine,
//! append-only submission log and permission propagation.
//!
//! Ratings enter as ciphertext envelopes, get ingested through the capability
//! provider and are folded into running (sum, count) accumulators with
//! homomorphic `add` only. The core never decrypts and never branches on a
//! plaintext rating; reading a statistic hands back the opaque handle for an
//! authorized party to decrypt off-core.
//!
//! Every public operation is one all-or-nothing transaction: all fallible
//! provider calls happen before the first core-state write, so a failed call
//! leaves no trace.

use crate::access::{AccessControl, Resource};
use chrono::{DateTime, Utc};
use fhe_provider::provider::{CapabilityProvider, ProviderError};
use fhe_provider::types::{Address, EncryptedInput, OpaqueValue};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Grouping key for a submission (e.g. a department id). `0` is an ordinary
/// key conventionally read as "uncategorized".
pub type Category = u32;

#[derive(Debug, Error)]
pub enum SurveyError {
    #[error("identity already submitted for this category")]
    DuplicateSubmission,

    #[error("ciphertext proof rejected")]
    InvalidProof,

    #[error("caller is not a manager")]
    Unauthorized,

    #[error("grant target is not a manager")]
    NotAManager,

    #[error("no submissions recorded for category {0}")]
    UnknownDepartment(Category),

    #[error("provider failure: {0}")]
    Provider(#[from] ProviderError),
}

/// Running aggregate over opaque values. The pair is replaced wholesale on
/// every accepted submission; old handles stay valid for anyone already
/// granted on them.
#[derive(Clone, Copy, Debug)]
pub struct Accumulator {
    pub sum: OpaqueValue,
    pub count: OpaqueValue,
}

/// One accepted submission. Immutable once appended.
#[derive(Clone, Debug, Serialize)]
pub struct SubmissionRecord {
    pub sequence_id: u64,
    pub identity: Address,
    pub category: Category,
    pub rating: OpaqueValue,
    pub category_value: OpaqueValue,
    pub feedback: String,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    SubmissionAccepted {
        sequence_id: u64,
        identity: Address,
        submitted_at: DateTime<Utc>,
    },
    ManagerAdded {
        target: Address,
        actor: Address,
    },
    ManagerRemoved {
        target: Address,
        actor: Address,
    },
}

pub struct Survey<P: CapabilityProvider> {
    provider: P,
    access: AccessControl,
    dedup: HashSet<(Address, Category)>,
    submissions: Vec<SubmissionRecord>,
    global: Accumulator,
    departments: HashMap<Category, Accumulator>,
    events: Vec<Event>,
}

impl<P: CapabilityProvider> Survey<P> {
    /// Seeds the role set with `owner` and initializes the global accumulator
    /// to encrypted zeros.
    pub fn new(mut provider: P, owner: Address) -> Result<Self, SurveyError> {
        let sum = provider.as_constant(0);
        let count = provider.as_constant(0);
        provider.allow_self(sum)?;
        provider.allow_self(count)?;

        Ok(Self {
            provider,
            access: AccessControl::new(owner),
            dedup: HashSet::new(),
            submissions: Vec::new(),
            global: Accumulator { sum, count },
            departments: HashMap::new(),
            events: Vec::new(),
        })
    }

    /// Accept one encrypted rating for a category.
    ///
    /// Enforces at-most-one submission per (identity, category), ingests both
    /// envelopes through the provider, folds the rating into the global and
    /// per-category accumulators and propagates decryption grants onto the
    /// fresh handles. Returns the assigned sequence id.
    pub fn submit(
        &mut self,
        caller: Address,
        category: Category,
        rating_input: &EncryptedInput,
        category_input: &EncryptedInput,
        feedback: String,
    ) -> Result<u64, SurveyError> {
        if self.dedup.contains(&(caller, category)) {
            return Err(SurveyError::DuplicateSubmission);
        }

        let rating = ingest(&mut self.provider, rating_input)?;
        let category_value = ingest(&mut self.provider, category_input)?;

        // Stage every new handle before committing anything.
        let one = self.provider.as_constant(1);
        let dept = match self.departments.get(&category) {
            Some(acc) => *acc,
            None => Accumulator {
                sum: self.provider.as_constant(0),
                count: self.provider.as_constant(0),
            },
        };

        let global = Accumulator {
            sum: self.provider.add(self.global.sum, rating)?,
            count: self.provider.add(self.global.count, one)?,
        };
        let dept = Accumulator {
            sum: self.provider.add(dept.sum, rating)?,
            count: self.provider.add(dept.count, one)?,
        };

        self.propagate(category, &global, &dept)?;

        // Commit; nothing below can fail.
        let sequence_id = self.submissions.len() as u64;
        let submitted_at = Utc::now();

        self.global = global;
        self.departments.insert(category, dept);
        self.dedup.insert((caller, category));
        self.submissions.push(SubmissionRecord {
            sequence_id,
            identity: caller,
            category,
            rating,
            category_value,
            feedback,
            submitted_at,
        });
        self.events.push(Event::SubmissionAccepted {
            sequence_id,
            identity: caller,
            submitted_at,
        });
        tracing::info!(sequence_id, identity = %caller, category, "submission accepted");

        Ok(sequence_id)
    }

    /// Grant decryption capability on freshly minted accumulator handles.
    ///
    /// The contract itself keeps decrypt rights on every handle. Global
    /// handles are extended to every current manager. Category handles are
    /// re-extended only to identities already in that resource's grant log
    /// who still hold the manager role; anyone removed keeps their grants on
    /// the handles that existed back then, nothing more.
    fn propagate(
        &mut self,
        category: Category,
        global: &Accumulator,
        dept: &Accumulator,
    ) -> Result<(), SurveyError> {
        for handle in [global.sum, global.count, dept.sum, dept.count] {
            self.provider.allow_self(handle)?;
        }

        let managers: Vec<Address> = self.access.managers().copied().collect();
        for manager in &managers {
            self.provider.allow(global.sum, *manager)?;
            self.provider.allow(global.count, *manager)?;
        }
        for manager in &managers {
            self.access.record_grant(Resource::GlobalSum, *manager);
            self.access.record_grant(Resource::GlobalCount, *manager);
        }

        let dept_sum_grantees: Vec<Address> = self
            .access
            .grantees(Resource::DepartmentSum(category))
            .filter(|g| self.access.is_manager(g))
            .copied()
            .collect();
        for grantee in dept_sum_grantees {
            self.provider.allow(dept.sum, grantee)?;
        }

        let dept_count_grantees: Vec<Address> = self
            .access
            .grantees(Resource::DepartmentCount(category))
            .filter(|g| self.access.is_manager(g))
            .copied()
            .collect();
        for grantee in dept_count_grantees {
            self.provider.allow(dept.count, grantee)?;
        }

        Ok(())
    }

    /// Live role check guarding every statistic read and admin operation.
    fn require_manager(&self, caller: &Address) -> Result<(), SurveyError> {
        if self.access.is_manager(caller) {
            Ok(())
        } else {
            Err(SurveyError::Unauthorized)
        }
    }

    pub fn add_manager(&mut self, caller: Address, target: Address) -> Result<(), SurveyError> {
        self.require_manager(&caller)?;

        // A manager added after submissions exist can read the running global
        // totals right away. Per-category resources stay behind an explicit
        // department grant.
        if !self.submissions.is_empty() {
            self.provider.allow(self.global.sum, target)?;
            self.provider.allow(self.global.count, target)?;
            self.access.record_grant(Resource::GlobalSum, target);
            self.access.record_grant(Resource::GlobalCount, target);
        }

        self.access.set_manager(target, true);
        self.events.push(Event::ManagerAdded {
            target,
            actor: caller,
        });
        tracing::info!(%target, actor = %caller, "manager added");
        Ok(())
    }

    /// Clears the role flag only. Grants already issued to `target` stay
    /// usable off-core; revocation gates live queries, it does not retract
    /// capability.
    pub fn remove_manager(&mut self, caller: Address, target: Address) -> Result<(), SurveyError> {
        self.require_manager(&caller)?;

        self.access.set_manager(target, false);
        self.events.push(Event::ManagerRemoved {
            target,
            actor: caller,
        });
        tracing::info!(%target, actor = %caller, "manager removed");
        Ok(())
    }

    /// Grant `target` decryption capability on one department's accumulator.
    ///
    /// The grant-log entry is recorded even when the department has no
    /// accumulator yet; the concrete handles are granted on the department's
    /// first propagation.
    pub fn grant_department_access(
        &mut self,
        caller: Address,
        target: Address,
        category: Category,
    ) -> Result<(), SurveyError> {
        self.require_manager(&caller)?;
        if !self.access.is_manager(&target) {
            return Err(SurveyError::NotAManager);
        }

        if let Some(acc) = self.departments.get(&category).copied() {
            self.provider.allow(acc.sum, target)?;
            self.provider.allow(acc.count, target)?;
        }
        self.access.record_grant(Resource::DepartmentSum(category), target);
        self.access.record_grant(Resource::DepartmentCount(category), target);
        Ok(())
    }

    /// Element-wise variant; earlier grants are never undone by later ones.
    pub fn grant_multiple_department_access(
        &mut self,
        caller: Address,
        target: Address,
        categories: &[Category],
    ) -> Result<(), SurveyError> {
        for category in categories {
            self.grant_department_access(caller, target, *category)?;
        }
        Ok(())
    }

    pub fn response_count(&self, caller: &Address) -> Result<OpaqueValue, SurveyError> {
        self.require_manager(caller)?;
        Ok(self.global.count)
    }

    pub fn total_rating_sum(&self, caller: &Address) -> Result<OpaqueValue, SurveyError> {
        self.require_manager(caller)?;
        Ok(self.global.sum)
    }

    pub fn department_stats(
        &self,
        caller: &Address,
        category: Category,
    ) -> Result<(OpaqueValue, OpaqueValue), SurveyError> {
        self.require_manager(caller)?;
        let acc = self
            .departments
            .get(&category)
            .ok_or(SurveyError::UnknownDepartment(category))?;
        Ok((acc.sum, acc.count))
    }

    /// Number of accepted submissions. Not privacy sensitive; callable by
    /// anyone.
    pub fn response_array_length(&self) -> u64 {
        self.submissions.len() as u64
    }

    pub fn is_manager(&self, identity: &Address) -> bool {
        self.access.is_manager(identity)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }
}

/// Ingest a ciphertext envelope, mapping a failed proof to the submission
/// error the caller sees.
fn ingest<P: CapabilityProvider>(
    provider: &mut P,
    input: &EncryptedInput,
) -> Result<OpaqueValue, SurveyError> {
    provider.from_external(input).map_err(|e| match e {
        ProviderError::InvalidProof => SurveyError::InvalidProof,
        other => SurveyError::Provider(other),
    })
}
