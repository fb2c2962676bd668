//! Recognizers for macro-expanded shapes the planner treats specially.

use cel_core_common::{operators, Expr, SpannedExpr};

/// The parts of a `cel.bind` in comprehension form: an empty-list range and
/// a constant-false loop condition. The accumulator is the bound variable,
/// its initializer the bound value and the result the body.
pub(super) struct BindShape<'e> {
    pub(super) var: &'e str,
    pub(super) init: &'e SpannedExpr,
    pub(super) body: &'e SpannedExpr,
}

pub(super) fn bind_shape(expr: &SpannedExpr) -> Option<BindShape<'_>> {
    match &expr.node {
        Expr::Bind {
            var_name,
            init,
            body,
        } => Some(BindShape {
            var: var_name,
            init,
            body,
        }),
        Expr::Comprehension {
            iter_range,
            accu_var,
            accu_init,
            loop_condition,
            result,
            ..
        } if matches!(&iter_range.node, Expr::List(elements) if elements.is_empty())
            && matches!(loop_condition.node, Expr::Bool(false)) =>
        {
            Some(BindShape {
                var: accu_var,
                init: accu_init,
                body: result,
            })
        }
        _ => None,
    }
}

/// True if a comprehension only ever appends list literals to an
/// accumulator that starts empty and is returned as is, so the accumulator
/// can be built in place.
pub(super) fn is_list_append(
    accu_var: &str,
    accu_init: &SpannedExpr,
    loop_condition: &SpannedExpr,
    loop_step: &SpannedExpr,
    result: &SpannedExpr,
) -> bool {
    let starts_empty = matches!(&accu_init.node, Expr::List(elements) if elements.is_empty());
    let returns_accu = is_ident(result, accu_var);
    let appends = match &loop_step.node {
        Expr::Call {
            function,
            target: None,
            args,
        } if function == operators::CONDITIONAL => match args.as_slice() {
            [cond, then, otherwise] => {
                !references(cond, accu_var)
                    && is_append(then, accu_var)
                    && is_ident(otherwise, accu_var)
            }
            _ => false,
        },
        _ => is_append(loop_step, accu_var),
    };
    starts_empty && returns_accu && appends && !references(loop_condition, accu_var)
}

/// `accu + [..]` where the list does not read the accumulator.
fn is_append(expr: &SpannedExpr, accu_var: &str) -> bool {
    match &expr.node {
        Expr::Call {
            function,
            target: None,
            args,
        } if function == operators::ADD => match args.as_slice() {
            [lhs, rhs] => {
                is_ident(lhs, accu_var)
                    && matches!(rhs.node, Expr::List(_))
                    && !references(rhs, accu_var)
            }
            _ => false,
        },
        _ => false,
    }
}

fn is_ident(expr: &SpannedExpr, name: &str) -> bool {
    matches!(&expr.node, Expr::Ident(n) if n == name)
}

/// True if `name` appears as an identifier anywhere in the subtree.
pub(super) fn references(expr: &SpannedExpr, name: &str) -> bool {
    is_ident(expr, name) || expr.children().into_iter().any(|c| references(c, name))
}
