//! Turns an expression tree into a [`Program`].
//!
//! Subtrees without control flow become direct (recursive) trees; logic,
//! ternaries, comprehensions and binds become stack-machine steps with
//! relative jumps. Names are resolved here: comprehension and bind
//! variables become slot reads, qualified type and enum names become
//! constants, and everything else is looked up in the activation.

mod direct;
mod scope;
mod shapes;

use std::sync::Arc;

use cel_core_common::{operators, Expr, ExprId, ListElement, MapEntry, SpannedExpr, StructField};
use rustc_hash::FxHashSet;

use crate::error::PlanError;
use crate::eval::{LogicOp, Plan, Step};
use crate::functions::{FunctionRegistry, Overload};
use crate::options::RuntimeOptions;
use crate::program::Program;
use crate::types::{StructType, TypeRegistry};
use crate::value::Value;
use scope::{Binding, Scopes};

/// Builds programs against a function registry and a type registry.
///
/// # Example
///
/// ```
/// use cel_core_common::{operators, ExprFactory};
/// use cel_core_runtime::{
///     EmptyActivation, FunctionRegistry, Planner, RuntimeOptions, TypeRegistry, Value,
/// };
///
/// let functions = FunctionRegistry::with_standard_library();
/// let types = TypeRegistry::new();
/// let planner = Planner::new(&functions, &types, RuntimeOptions::default());
///
/// let mut f = ExprFactory::new();
/// let (one, two) = (f.int(1), f.int(2));
/// let expr = f.binary(operators::ADD, one, two);
///
/// let program = planner.plan(&expr).unwrap();
/// assert_eq!(program.evaluate(&EmptyActivation).unwrap(), Value::Int(3));
/// ```
#[derive(Debug)]
pub struct Planner<'r> {
    functions: &'r FunctionRegistry,
    types: &'r TypeRegistry,
    options: RuntimeOptions,
}

impl<'r> Planner<'r> {
    pub fn new(functions: &'r FunctionRegistry, types: &'r TypeRegistry, options: RuntimeOptions) -> Self {
        Self {
            functions,
            types,
            options,
        }
    }

    pub fn options(&self) -> &RuntimeOptions {
        &self.options
    }

    /// Plan an expression.
    pub fn plan(&self, expr: &SpannedExpr) -> Result<Program, PlanError> {
        let mut builder = PlanBuilder {
            planner: self,
            scopes: Scopes::default(),
            subexpressions: Vec::new(),
            slot_count: 0,
        };
        let mut main = Vec::new();
        builder.plan_expr(expr, &mut main)?;
        let uses_recursive_root = matches!(main.as_slice(), [Step::Direct(_)]);

        let plan = Plan {
            main,
            subexpressions: builder.subexpressions,
            slot_count: builder.slot_count,
        };
        plan.validate()?;

        tracing::debug!(
            steps = plan.main.len(),
            subexpressions = plan.subexpressions.len(),
            slots = plan.slot_count,
            uses_recursive_root,
            "planned expression"
        );
        Ok(Program::new(plan, self.options.clone(), uses_recursive_root))
    }
}

/// How a name resolves at plan time.
enum Resolved {
    Local(Binding),
    Constant(Value),
    Activation,
}

/// State for planning one expression.
struct PlanBuilder<'p, 'r> {
    planner: &'p Planner<'r>,
    scopes: Scopes,
    subexpressions: Vec<Vec<Step>>,
    slot_count: usize,
}

impl PlanBuilder<'_, '_> {
    fn options(&self) -> &RuntimeOptions {
        &self.planner.options
    }

    fn allocate_slot(&mut self) -> usize {
        let slot = self.slot_count;
        self.slot_count += 1;
        slot
    }

    fn resolve(&self, name: &str) -> Resolved {
        if let Some(binding) = self.scopes.lookup(name) {
            return Resolved::Local(binding);
        }
        match self.planner.types.find_constant(name) {
            Some(value) => Resolved::Constant(value),
            None => Resolved::Activation,
        }
    }

    /// A select chain such as `acme.Color.RED` that names a registered
    /// constant and is not rooted at a local variable.
    fn qualified_constant(&self, expr: &SpannedExpr) -> Option<Value> {
        let name = expr.node.qualified_name()?;
        if self.scopes.shadows(&name) {
            return None;
        }
        self.planner.types.find_constant(&name)
    }

    /// The function name, overloads and whether the target is passed as the
    /// receiver. A target that names a namespace (`optional.of(x)`) selects
    /// the global function of the qualified name instead.
    fn resolve_function(
        &self,
        expr_id: ExprId,
        function: &str,
        target: Option<&SpannedExpr>,
        arg_count: usize,
    ) -> Result<(Arc<str>, Arc<[Arc<Overload>]>, bool), PlanError> {
        let functions = self.planner.functions;
        if let Some(target) = target {
            if let Some(namespace) = target.node.qualified_name() {
                if !self.scopes.shadows(&namespace) {
                    let qualified = format!("{}.{}", namespace, function);
                    let overloads = functions.find_overloads(&qualified, false, arg_count);
                    if !overloads.is_empty() {
                        return Ok((Arc::from(qualified), overloads.into(), false));
                    }
                }
            }
        }
        let receiver_style = target.is_some();
        let arity = arg_count + usize::from(receiver_style);
        let overloads = functions.find_overloads(function, receiver_style, arity);
        if overloads.is_empty() {
            return Err(PlanError::NoOverloads {
                expr_id,
                function: function.to_string(),
                arity,
            });
        }
        Ok((Arc::from(function), overloads.into(), receiver_style))
    }

    fn find_struct(&self, expr_id: ExprId, type_name: &str, fields: &[StructField]) -> Result<StructType, PlanError> {
        let struct_type = self
            .planner
            .types
            .find_struct(type_name)
            .ok_or_else(|| PlanError::UnknownStructType {
                expr_id,
                type_name: type_name.to_string(),
            })?;
        if let Some(field) = fields.iter().find(|f| !struct_type.has_field(&f.name)) {
            return Err(PlanError::NoSuchField {
                expr_id,
                type_name: type_name.to_string(),
                field: field.name.clone(),
            });
        }
        Ok(struct_type.clone())
    }

    fn plan_subexpression(&mut self, expr: &SpannedExpr) -> Result<usize, PlanError> {
        let mut steps = Vec::new();
        self.plan_expr(expr, &mut steps)?;
        self.subexpressions.push(steps);
        Ok(self.subexpressions.len() - 1)
    }

    fn plan_expr(&mut self, expr: &SpannedExpr, out: &mut Vec<Step>) -> Result<(), PlanError> {
        if has_children(&expr.node) && self.direct_eligible(expr) {
            let node = self.build_direct(expr)?;
            out.push(Step::Direct(node));
            return Ok(());
        }

        let id = expr.id;
        match &expr.node {
            Expr::Null
            | Expr::Bool(_)
            | Expr::Int(_)
            | Expr::UInt(_)
            | Expr::Double(_)
            | Expr::String(_)
            | Expr::Bytes(_) => out.push(Step::Const(literal(&expr.node))),
            Expr::Ident(name) => self.plan_ident(id, name, out),
            Expr::Select {
                operand,
                field,
                test_only,
                optional,
            } => {
                if !test_only && !optional {
                    if let Some(value) = self.qualified_constant(expr) {
                        out.push(Step::Const(value));
                        return Ok(());
                    }
                }
                self.plan_expr(operand, out)?;
                out.push(Step::Select {
                    field: Arc::from(field.as_str()),
                    test_only: *test_only,
                    optional: *optional,
                    expr_id: id,
                });
            }
            Expr::Call {
                function,
                target,
                args,
            } => self.plan_call(id, function, target.as_deref(), args, out)?,
            Expr::List(elements) => {
                for element in elements {
                    self.plan_expr(&element.expr, out)?;
                }
                out.push(Step::CreateList {
                    size: elements.len() as i64,
                    optional_indices: list_optionals(elements),
                    expr_id: id,
                });
            }
            Expr::Map(entries) => {
                for entry in entries {
                    self.plan_expr(&entry.key, out)?;
                    self.plan_expr(&entry.value, out)?;
                }
                out.push(Step::CreateMap {
                    entries: entries.len(),
                    optional_indices: map_optionals(entries),
                    expr_id: id,
                });
            }
            Expr::Struct { type_name, fields } => {
                let struct_type = self.find_struct(id, type_name, fields)?;
                for field in fields {
                    self.plan_expr(&field.value, out)?;
                }
                out.push(Step::CreateStruct {
                    struct_type,
                    fields: field_names(fields),
                    optional_indices: struct_optionals(fields),
                    expr_id: id,
                });
            }
            Expr::Comprehension { .. } | Expr::Bind { .. } => self.plan_comprehension(expr, out)?,
            Expr::Error => {
                return Err(PlanError::InvalidExpression {
                    expr_id: id,
                    message: "expression contains an error node".to_string(),
                })
            }
        }
        Ok(())
    }

    fn plan_ident(&mut self, id: ExprId, name: &str, out: &mut Vec<Step>) {
        match self.resolve(name) {
            Resolved::Local(Binding::Slot(slot)) => out.push(Step::Slot(slot)),
            Resolved::Local(Binding::Lazy {
                slot,
                subexpression,
            }) => {
                out.push(Step::CheckLazyInit {
                    slot,
                    subexpression,
                });
                out.push(Step::AssignSlot { slot, pop: false });
            }
            Resolved::Constant(value) => out.push(Step::Const(value)),
            Resolved::Activation => out.push(Step::Ident {
                name: Arc::from(name),
                expr_id: id,
            }),
        }
    }

    fn plan_call(
        &mut self,
        id: ExprId,
        function: &str,
        target: Option<&SpannedExpr>,
        args: &[SpannedExpr],
        out: &mut Vec<Step>,
    ) -> Result<(), PlanError> {
        match (function, target, args) {
            (operators::LOGICAL_AND, None, [lhs, rhs]) => {
                return self.plan_logic(id, LogicOp::And, lhs, rhs, out)
            }
            (operators::LOGICAL_OR, None, [lhs, rhs]) => {
                return self.plan_logic(id, LogicOp::Or, lhs, rhs, out)
            }
            (operators::CONDITIONAL, None, [cond, then, otherwise]) => {
                return self.plan_ternary(id, cond, then, otherwise, out)
            }
            (operators::INDEX | operators::OPTIONAL_INDEX, None, [container, key]) => {
                self.plan_expr(container, out)?;
                self.plan_expr(key, out)?;
                out.push(Step::Index {
                    optional: function == operators::OPTIONAL_INDEX,
                    expr_id: id,
                });
                return Ok(());
            }
            _ => {}
        }

        let (name, overloads, receiver) = self.resolve_function(id, function, target, args.len())?;
        if let (Some(target), true) = (target, receiver) {
            self.plan_expr(target, out)?;
        }
        for arg in args {
            self.plan_expr(arg, out)?;
        }
        out.push(Step::Call {
            function: name,
            overloads,
            arity: args.len() + usize::from(receiver),
            expr_id: id,
        });
        Ok(())
    }

    /// `[lhs] JumpIfBool [rhs] Logic`, or `[lhs] [rhs] Logic` without
    /// short-circuiting.
    fn plan_logic(
        &mut self,
        id: ExprId,
        op: LogicOp,
        lhs: &SpannedExpr,
        rhs: &SpannedExpr,
        out: &mut Vec<Step>,
    ) -> Result<(), PlanError> {
        self.plan_expr(lhs, out)?;
        let mut right = Vec::new();
        self.plan_expr(rhs, &mut right)?;
        if self.options().short_circuiting {
            out.push(Step::JumpIfBool {
                absorbing: op.absorbing(),
                offset: right.len() as isize + 1,
            });
        }
        out.append(&mut right);
        out.push(Step::Logic { op, expr_id: id });
        Ok(())
    }

    /// `[cond] CondJump [then] Jump [else]`.
    fn plan_ternary(
        &mut self,
        id: ExprId,
        cond: &SpannedExpr,
        then: &SpannedExpr,
        otherwise: &SpannedExpr,
        out: &mut Vec<Step>,
    ) -> Result<(), PlanError> {
        self.plan_expr(cond, out)?;
        let mut then_steps = Vec::new();
        self.plan_expr(then, &mut then_steps)?;
        let mut else_steps = Vec::new();
        self.plan_expr(otherwise, &mut else_steps)?;

        let then_len = then_steps.len() as isize;
        let else_len = else_steps.len() as isize;
        out.push(Step::CondJump {
            else_offset: then_len + 1,
            error_offset: then_len + 1 + else_len,
            expr_id: id,
        });
        out.append(&mut then_steps);
        out.push(Step::Jump(else_len));
        out.append(&mut else_steps);
        Ok(())
    }

    fn plan_comprehension(&mut self, expr: &SpannedExpr, out: &mut Vec<Step>) -> Result<(), PlanError> {
        if let Some(bind) = shapes::bind_shape(expr) {
            return self.plan_bind(bind, out);
        }
        let Expr::Comprehension {
            iter_var,
            iter_range,
            accu_var,
            accu_init,
            loop_condition,
            loop_step,
            result,
            short_circuit,
        } = &expr.node
        else {
            return Err(PlanError::InvalidExpression {
                expr_id: expr.id,
                message: "expected a comprehension".to_string(),
            });
        };

        let iter_slot = self.allocate_slot();
        let accu_slot = self.allocate_slot();

        self.plan_expr(iter_range, out)?;
        let list_append = self.options().enable_comprehension_list_append
            && shapes::is_list_append(accu_var, accu_init, loop_condition, loop_step, result);
        if list_append {
            out.push(Step::CreateMutableList);
        } else {
            self.plan_expr(accu_init, out)?;
        }

        self.scopes.push(accu_var, Binding::Slot(accu_slot));
        let mut result_steps = Vec::new();
        let planned = self.plan_expr(result, &mut result_steps);
        self.scopes.push(iter_var, Binding::Slot(iter_slot));
        let mut cond_steps = Vec::new();
        let mut step_steps = Vec::new();
        let planned = planned
            .and_then(|_| self.plan_expr(loop_condition, &mut cond_steps))
            .and_then(|_| self.plan_expr(loop_step, &mut step_steps));
        self.scopes.pop();
        self.scopes.pop();
        planned?;

        let r = result_steps.len() as isize;
        let c = cond_steps.len() as isize;
        let s = step_steps.len() as isize;

        out.push(Step::ComprehensionInit {
            accu_slot,
            end_offset: r + c + s + 6,
            expr_id: expr.id,
        });
        out.push(Step::ComprehensionNext {
            iter_slot,
            body_offset: r + 2,
            error_offset: r,
            expr_id: expr.id,
        });
        out.append(&mut result_steps);
        out.push(Step::ComprehensionFinish {
            iter_slot,
            accu_slot,
        });
        out.push(Step::Jump(c + s + 3));
        out.append(&mut cond_steps);
        out.push(Step::ComprehensionCond {
            short_circuit: *short_circuit,
            result_offset: -(r + c + 3),
            finish_offset: -(c + 3),
            expr_id: expr.id,
        });
        out.append(&mut step_steps);
        out.push(Step::AssignSlot {
            slot: accu_slot,
            pop: true,
        });
        out.push(Step::Jump(-(r + c + s + 6)));
        Ok(())
    }

    fn plan_bind(&mut self, bind: shapes::BindShape<'_>, out: &mut Vec<Step>) -> Result<(), PlanError> {
        let slot = self.allocate_slot();
        let binding = if self.options().enable_lazy_bind_initialization {
            let subexpression = self.plan_subexpression(bind.init)?;
            Binding::Lazy {
                slot,
                subexpression,
            }
        } else {
            self.plan_expr(bind.init, out)?;
            out.push(Step::AssignSlot { slot, pop: true });
            Binding::Slot(slot)
        };

        self.scopes.push(bind.var, binding);
        let planned = self.plan_expr(bind.body, out);
        self.scopes.pop();
        planned?;
        out.push(Step::ClearSlot(slot));
        Ok(())
    }
}

fn has_children(expr: &Expr) -> bool {
    matches!(
        expr,
        Expr::Select { .. } | Expr::Call { .. } | Expr::List(_) | Expr::Map(_) | Expr::Struct { .. }
    )
}

fn literal(expr: &Expr) -> Value {
    match expr {
        Expr::Bool(b) => Value::Bool(*b),
        Expr::Int(i) => Value::Int(*i),
        Expr::UInt(u) => Value::UInt(*u),
        Expr::Double(d) => Value::Double(*d),
        Expr::String(s) => Value::string(s.as_str()),
        Expr::Bytes(b) => Value::bytes(b.as_slice()),
        _ => Value::Null,
    }
}

fn list_optionals(elements: &[ListElement]) -> FxHashSet<usize> {
    optional_positions(elements.iter().map(|e| e.optional))
}

fn map_optionals(entries: &[MapEntry]) -> FxHashSet<usize> {
    optional_positions(entries.iter().map(|e| e.optional))
}

fn struct_optionals(fields: &[StructField]) -> FxHashSet<usize> {
    optional_positions(fields.iter().map(|f| f.optional))
}

fn optional_positions(flags: impl Iterator<Item = bool>) -> FxHashSet<usize> {
    flags
        .enumerate()
        .filter_map(|(i, optional)| optional.then_some(i))
        .collect()
}

fn field_names(fields: &[StructField]) -> Arc<[Arc<str>]> {
    fields.iter().map(|f| Arc::from(f.name.as_str())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::{EmptyActivation, MapActivation};
    use crate::types::{EnumType, StructType};
    use crate::value::EnumValue;
    use cel_core_common::ExprFactory;
    use pretty_assertions::assert_eq;

    fn plan_with(expr: &SpannedExpr, options: RuntimeOptions) -> Result<Program, PlanError> {
        let functions = FunctionRegistry::with_standard_library();
        let types = TypeRegistry::new()
            .with_struct(StructType::new("acme.User", ["name", "age"]))
            .with_enum(EnumType::new("acme.Color").with_constant("BLUE", 2));
        Planner::new(&functions, &types, options).plan(expr)
    }

    #[test]
    fn test_arithmetic_root_is_direct() {
        let mut f = ExprFactory::new();
        let (a, b) = (f.int(6), f.int(7));
        let expr = f.binary(operators::MULTIPLY, a, b);

        let program = plan_with(&expr, RuntimeOptions::default()).unwrap();
        assert!(program.uses_recursive_root());
        assert_eq!(program.step_count(), 1);
        assert_eq!(program.evaluate(&EmptyActivation).unwrap(), Value::Int(42));

        let program = plan_with(&expr, RuntimeOptions::default().with_recursive_planning(false)).unwrap();
        assert!(!program.uses_recursive_root());
        assert_eq!(program.step_count(), 3);
        assert_eq!(program.evaluate(&EmptyActivation).unwrap(), Value::Int(42));
    }

    #[test]
    fn test_depth_limit_falls_back_to_steps() {
        let mut f = ExprFactory::new();
        let mut expr = f.int(0);
        for i in 1..5 {
            let rhs = f.int(i);
            expr = f.binary(operators::ADD, expr, rhs);
        }
        let options = RuntimeOptions::default().with_max_recursion_depth(Some(2));
        let program = plan_with(&expr, options).unwrap();
        assert!(!program.uses_recursive_root());
        assert_eq!(program.evaluate(&EmptyActivation).unwrap(), Value::Int(10));
    }

    #[test]
    fn test_unregistered_function() {
        let mut f = ExprFactory::new();
        let arg = f.int(1);
        let expr = f.call("frobnicate", vec![arg]);
        assert_eq!(
            plan_with(&expr, RuntimeOptions::default()).unwrap_err(),
            PlanError::NoOverloads {
                expr_id: expr.id,
                function: "frobnicate".to_string(),
                arity: 1
            }
        );
    }

    #[test]
    fn test_struct_literal_checks() {
        let mut f = ExprFactory::new();
        let name = f.string("ada");
        let expr = f.structure("acme.User", vec![("name", name)]);
        assert!(plan_with(&expr, RuntimeOptions::default()).is_ok());

        let email = f.string("a@b.c");
        let expr = f.structure("acme.User", vec![("email", email)]);
        assert!(matches!(
            plan_with(&expr, RuntimeOptions::default()),
            Err(PlanError::NoSuchField { .. })
        ));

        let expr = f.structure("acme.Order", Vec::new());
        assert!(matches!(
            plan_with(&expr, RuntimeOptions::default()),
            Err(PlanError::UnknownStructType { .. })
        ));
    }

    #[test]
    fn test_error_node_is_rejected() {
        let expr = SpannedExpr::new(9, Expr::Error, 0..0);
        assert!(matches!(
            plan_with(&expr, RuntimeOptions::default()),
            Err(PlanError::InvalidExpression { expr_id: 9, .. })
        ));
    }

    #[test]
    fn test_qualified_enum_constant() {
        let mut f = ExprFactory::new();
        let acme = f.ident("acme");
        let color = f.select(acme, "Color");
        let expr = f.select(color, "BLUE");
        let program = plan_with(&expr, RuntimeOptions::default()).unwrap();
        assert_eq!(
            program.evaluate(&EmptyActivation).unwrap(),
            Value::Enum(EnumValue::new("acme.Color", 2))
        );
    }

    #[test]
    fn test_namespaced_function() {
        let mut f = ExprFactory::new();
        let optional = f.ident("optional");
        let five = f.int(5);
        let expr = f.member_call("of", optional, vec![five]);
        let program = plan_with(&expr, RuntimeOptions::default()).unwrap();
        assert_eq!(
            program.evaluate(&EmptyActivation).unwrap(),
            Value::optional_some(Value::Int(5))
        );
    }

    #[test]
    fn test_comprehension_variables_shadow_activation() {
        let mut f = ExprFactory::new();
        let (one, two) = (f.int(1), f.int(2));
        let range = f.list(vec![one, two]);
        let x = f.ident("x");
        let expr = f.map_macro(range, "x", x);
        let activation = MapActivation::new().with_binding("x", 100i64);
        let program = plan_with(&expr, RuntimeOptions::default()).unwrap();
        assert_eq!(
            program.evaluate(&activation).unwrap(),
            Value::list(vec![Value::Int(1), Value::Int(2)])
        );
    }

    #[test]
    fn test_comprehension_layout() {
        let mut f = ExprFactory::new();
        let range = f.ident("xs");
        let x = f.ident("x");
        let zero = f.int(0);
        let pred = f.binary(operators::GREATER, x, zero);
        let expr = f.all(range, "x", pred);

        let program = plan_with(&expr, RuntimeOptions::default()).unwrap();
        let steps: Vec<String> = program
            .plan()
            .main
            .iter()
            .map(|s| format!("{:?}", s))
            .collect();
        assert_eq!(
            steps,
            vec![
                "Ident(xs)",
                "Const(true)",
                "ComprehensionInit(12)",
                "ComprehensionNext(3, 1)",
                "Slot(1)",
                "ComprehensionFinish",
                "Jump(8)",
                "Direct(@not_strictly_false([$1]))",
                "ComprehensionCond(-5, -4)",
                "Slot(1)",
                "JumpIfBool(false, 2)",
                "Direct(_>_([$0, 0]))",
                "Logic(And)",
                "AssignSlot(1, pop=true)",
                "Jump(-12)",
            ]
        );
    }
}
