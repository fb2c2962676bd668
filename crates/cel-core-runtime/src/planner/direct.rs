//! Planning of direct (recursive) subtrees.

use cel_core_common::{operators, Expr, SpannedExpr};

use super::scope::Binding;
use super::{
    field_names, list_optionals, literal, map_optionals, struct_optionals, PlanBuilder, Resolved,
};
use crate::error::PlanError;
use crate::eval::DirectNode;

impl PlanBuilder<'_, '_> {
    /// True if the subtree can run as one direct tree: recursive planning is
    /// on, the subtree is within the depth limit and nothing in it needs
    /// jumps, loops or lazy bindings.
    pub(super) fn direct_eligible(&self, expr: &SpannedExpr) -> bool {
        let options = self.options();
        if !options.enable_recursive_planning {
            return false;
        }
        if options
            .max_recursion_depth
            .is_some_and(|max| expr.depth() > max)
        {
            return false;
        }
        self.free_of_control_flow(expr)
    }

    fn free_of_control_flow(&self, expr: &SpannedExpr) -> bool {
        match &expr.node {
            Expr::Comprehension { .. } | Expr::Bind { .. } | Expr::Error => false,
            Expr::Ident(name) => !matches!(self.scopes.lookup(name), Some(Binding::Lazy { .. })),
            Expr::Call {
                function,
                target: None,
                ..
            } if is_control_flow(function) => false,
            _ => expr
                .children()
                .into_iter()
                .all(|child| self.free_of_control_flow(child)),
        }
    }

    pub(super) fn build_direct(&self, expr: &SpannedExpr) -> Result<DirectNode, PlanError> {
        let id = expr.id;
        let node = match &expr.node {
            Expr::Null
            | Expr::Bool(_)
            | Expr::Int(_)
            | Expr::UInt(_)
            | Expr::Double(_)
            | Expr::String(_)
            | Expr::Bytes(_) => DirectNode::Const(literal(&expr.node)),
            Expr::Ident(name) => match self.resolve(name) {
                Resolved::Local(Binding::Slot(slot)) => DirectNode::Slot(slot),
                Resolved::Local(Binding::Lazy { .. }) => return Err(not_direct(id)),
                Resolved::Constant(value) => DirectNode::Const(value),
                Resolved::Activation => DirectNode::Ident {
                    name: name.as_str().into(),
                    expr_id: id,
                },
            },
            Expr::Select {
                operand,
                field,
                test_only,
                optional,
            } => match self.qualified_constant(expr) {
                Some(value) if !test_only && !optional => DirectNode::Const(value),
                _ => DirectNode::Select {
                    operand: Box::new(self.build_direct(operand)?),
                    field: field.as_str().into(),
                    test_only: *test_only,
                    optional: *optional,
                    expr_id: id,
                },
            },
            Expr::Call {
                function,
                target,
                args,
            } => match (function.as_str(), target, args.as_slice()) {
                (operators::INDEX | operators::OPTIONAL_INDEX, None, [container, key]) => {
                    DirectNode::Index {
                        container: Box::new(self.build_direct(container)?),
                        key: Box::new(self.build_direct(key)?),
                        optional: function == operators::OPTIONAL_INDEX,
                        expr_id: id,
                    }
                }
                (name, None, _) if is_control_flow(name) => return Err(not_direct(id)),
                _ => {
                    let target = target.as_deref();
                    let (name, overloads, receiver) =
                        self.resolve_function(id, function, target, args.len())?;
                    let mut nodes = Vec::with_capacity(args.len() + 1);
                    if let (Some(target), true) = (target, receiver) {
                        nodes.push(self.build_direct(target)?);
                    }
                    for arg in args {
                        nodes.push(self.build_direct(arg)?);
                    }
                    DirectNode::Call {
                        function: name,
                        overloads,
                        args: nodes,
                        expr_id: id,
                    }
                }
            },
            Expr::List(elements) => DirectNode::CreateList {
                elements: elements
                    .iter()
                    .map(|e| self.build_direct(&e.expr))
                    .collect::<Result<_, _>>()?,
                optional_indices: list_optionals(elements),
                expr_id: id,
            },
            Expr::Map(entries) => {
                let mut nodes = Vec::with_capacity(entries.len() * 2);
                for entry in entries {
                    nodes.push(self.build_direct(&entry.key)?);
                    nodes.push(self.build_direct(&entry.value)?);
                }
                DirectNode::CreateMap {
                    entries: nodes,
                    optional_indices: map_optionals(entries),
                    expr_id: id,
                }
            }
            Expr::Struct { type_name, fields } => DirectNode::CreateStruct {
                struct_type: self.find_struct(id, type_name, fields)?,
                fields: field_names(fields),
                values: fields
                    .iter()
                    .map(|f| self.build_direct(&f.value))
                    .collect::<Result<_, _>>()?,
                optional_indices: struct_optionals(fields),
                expr_id: id,
            },
            Expr::Comprehension { .. } | Expr::Bind { .. } | Expr::Error => {
                return Err(not_direct(id))
            }
        };
        Ok(node)
    }
}

fn is_control_flow(function: &str) -> bool {
    matches!(
        function,
        operators::LOGICAL_AND | operators::LOGICAL_OR | operators::CONDITIONAL
    )
}

fn not_direct(expr_id: i64) -> PlanError {
    PlanError::InvalidExpression {
        expr_id,
        message: "node cannot be evaluated as a direct tree".to_string(),
    }
}
