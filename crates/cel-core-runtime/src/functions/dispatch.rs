//! Runtime overload selection.

use std::sync::Arc;

use super::Overload;
use crate::attribute::{AttributeTrail, AttributeUtility};
use crate::value::{EvalError, Value};

/// Invoke the overload of `function` that matches `args`.
///
/// Resolution order:
/// 1. a matching non-strict overload receives the raw arguments;
/// 2. otherwise the first `Error` argument is the result;
/// 3. otherwise any unknown arguments (by value or by trail) are merged
///    into the result;
/// 4. otherwise the matching strict overload is called.
pub(crate) fn dispatch(
    function: &str,
    overloads: &[Arc<Overload>],
    args: &[Value],
    trails: &[AttributeTrail],
    utility: &AttributeUtility<'_>,
    ambiguous_is_error: bool,
) -> Value {
    if let Some(overload) = overloads
        .iter()
        .find(|o| !o.descriptor.is_strict() && o.descriptor.match_arguments(args))
    {
        return overload.call(args);
    }

    if let Some(err) = args.iter().find(|v| v.is_error()) {
        return err.clone();
    }

    if let Some(unknowns) = utility.identify_and_merge_unknowns(args, trails, true) {
        return Value::unknown(unknowns);
    }

    let mut matches = overloads
        .iter()
        .filter(|o| o.descriptor.is_strict() && o.descriptor.match_arguments(args));
    match (matches.next(), matches.next()) {
        (None, _) => Value::error(EvalError::no_matching_overload(function)),
        (Some(_), Some(_)) if ambiguous_is_error => {
            Value::error(EvalError::ambiguous_overload(function))
        }
        (Some(overload), _) => overload.call(args),
    }
}
