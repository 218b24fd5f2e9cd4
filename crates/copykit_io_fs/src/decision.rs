//! Conflict decision providers and the sticky resolution protocol.

use std::path::Path;

use tracing::{debug, warn};

use crate::spec::{CopyBatchError, EnumConflictDecision};

/// Answers file-name collisions during a batch.
///
/// Called synchronously while the batch holds the store. Headless providers
/// must answer without blocking. Returning an error (conventionally
/// [`CopyBatchError::Cancelled`]) aborts the rest of the batch.
pub trait DecisionProvider {
    fn ask(
        &mut self,
        name_existing: &str,
        dir_target: &Path,
        if_allow_all: bool,
    ) -> Result<EnumConflictDecision, CopyBatchError>;
}

impl<F> DecisionProvider for F
where
    F: FnMut(&str, &Path, bool) -> Result<EnumConflictDecision, CopyBatchError>,
{
    fn ask(
        &mut self,
        name_existing: &str,
        dir_target: &Path,
        if_allow_all: bool,
    ) -> Result<EnumConflictDecision, CopyBatchError> {
        self(name_existing, dir_target, if_allow_all)
    }
}

/// Always gives the same answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecisionFixed(pub EnumConflictDecision);

impl DecisionFixed {
    pub fn overwrite() -> Self {
        Self(EnumConflictDecision::OverwriteOnce)
    }

    pub fn skip() -> Self {
        Self(EnumConflictDecision::SkipOnce)
    }
}

impl DecisionProvider for DecisionFixed {
    fn ask(
        &mut self,
        _name_existing: &str,
        _dir_target: &Path,
        _if_allow_all: bool,
    ) -> Result<EnumConflictDecision, CopyBatchError> {
        Ok(self.0)
    }
}

/// User-facing question for one collision.
pub fn format_conflict_message(name_existing: &str, dir_target: &Path) -> String {
    format!(
        "File '{name_existing}' already exists in directory '{}'",
        dir_target.display()
    )
}

/// Decide one collision. Returns `(overwrite, prompted)`.
///
/// `choice` is the batch's sticky slot, `None` for a lone file where no
/// later collision can follow.
pub(crate) fn resolve_conflict(
    decider: &mut dyn DecisionProvider,
    choice: Option<&mut EnumConflictDecision>,
    name_existing: &str,
    dir_target: &Path,
) -> Result<(bool, bool), CopyBatchError> {
    if let Some(decision) = choice.as_deref()
        && decision.is_sticky()
    {
        debug!(name = name_existing, decision = ?decision, "Applying sticky decision");
        return Ok((decision.is_overwrite(), false));
    }

    let if_allow_all = choice.is_some();
    let mut decision = decider.ask(name_existing, dir_target, if_allow_all)?;
    if decision == EnumConflictDecision::Unset {
        return Err(CopyBatchError::InvalidArgument(format!(
            "Decision provider gave no answer for `{name_existing}`"
        )));
    }
    if decision.is_sticky() && !if_allow_all {
        warn!(
            name = name_existing,
            decision = ?decision,
            "\"For all\" answer offered no options; applying once"
        );
        decision = decision.to_once();
    }
    if let Some(slot) = choice
        && decision.is_sticky()
    {
        *slot = decision;
    }
    debug!(
        name = name_existing,
        dir = %dir_target.display(),
        decision = ?decision,
        "Conflict resolved"
    );
    Ok((decision.is_overwrite(), true))
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::path::Path;

    use super::{DecisionFixed, DecisionProvider, format_conflict_message, resolve_conflict};
    use crate::spec::{CopyBatchError, EnumConflictDecision};

    #[test]
    fn sticky_slot_short_circuits_provider() {
        let mut decider = |_: &str, _: &Path, _: bool| -> Result<EnumConflictDecision, CopyBatchError> {
            panic!("must not prompt");
        };
        let mut choice = EnumConflictDecision::SkipAll;
        let (b_overwrite, b_prompted) =
            resolve_conflict(&mut decider, Some(&mut choice), "a.txt", Path::new("/t"))
                .expect("resolve");
        assert!(!b_overwrite);
        assert!(!b_prompted);
    }

    #[test]
    fn all_answer_becomes_sticky() {
        let mut decider = DecisionFixed(EnumConflictDecision::OverwriteAll);
        let mut choice = EnumConflictDecision::Unset;
        let (b_overwrite, _) =
            resolve_conflict(&mut decider, Some(&mut choice), "a.txt", Path::new("/t"))
                .expect("resolve");
        assert!(b_overwrite);
        assert_eq!(choice, EnumConflictDecision::OverwriteAll);
    }

    #[test]
    fn once_answer_leaves_slot_unset() {
        let mut decider = DecisionFixed::skip();
        let mut choice = EnumConflictDecision::Unset;
        let (b_overwrite, b_prompted) =
            resolve_conflict(&mut decider, Some(&mut choice), "a.txt", Path::new("/t"))
                .expect("resolve");
        assert!(!b_overwrite);
        assert!(b_prompted);
        assert_eq!(choice, EnumConflictDecision::Unset);
    }

    #[test]
    fn lone_file_offers_two_options() {
        let seen = RefCell::new(Vec::new());
        let mut decider = |_: &str,
                           _: &Path,
                           if_allow_all: bool|
         -> Result<EnumConflictDecision, CopyBatchError> {
            seen.borrow_mut().push(if_allow_all);
            Ok(EnumConflictDecision::SkipAll)
        };
        let (b_overwrite, _) =
            resolve_conflict(&mut decider, None, "a.txt", Path::new("/t")).expect("resolve");
        assert!(!b_overwrite);
        assert_eq!(*seen.borrow(), [false]);
    }

    #[test]
    fn unset_answer_is_rejected() {
        let mut decider = DecisionFixed(EnumConflictDecision::Unset);
        let err = resolve_conflict(&mut decider, None, "a.txt", Path::new("/t"))
            .expect_err("unset answer");
        assert!(matches!(err, CopyBatchError::InvalidArgument(_)));
    }

    #[test]
    fn provider_error_propagates() {
        let mut decider = |_: &str, _: &Path, _: bool| -> Result<EnumConflictDecision, CopyBatchError> {
            Err(CopyBatchError::Cancelled("user closed dialog".to_string()))
        };
        let err = decider.ask("a.txt", Path::new("/t"), true).expect_err("cancel");
        assert!(matches!(err, CopyBatchError::Cancelled(_)));
    }

    #[test]
    fn message_names_file_and_directory() {
        assert_eq!(
            format_conflict_message("a.txt", Path::new("/p/t")),
            "File 'a.txt' already exists in directory '/p/t'"
        );
    }
}
