//! Programmatic construction of AST nodes.
//!
//! `ExprFactory` assigns sequential node ids the same way the parser does,
//! and produces the standard macro expansions (`all`, `exists`,
//! `exists_one`, `map`, `filter`, `cel.bind`) in the comprehension shape the
//! runtime expects.

use crate::ast::{Expr, ExprId, ListElement, MapEntry, Spanned, SpannedExpr, StructField};
use crate::operators;

/// Builds expression trees with unique, increasing ids.
#[derive(Debug)]
pub struct ExprFactory {
    next_id: ExprId,
}

impl Default for ExprFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ExprFactory {
    pub fn new() -> Self {
        Self { next_id: 1 }
    }

    fn node(&mut self, expr: Expr) -> SpannedExpr {
        let id = self.next_id;
        self.next_id += 1;
        Spanned::new(id, expr, 0..0)
    }

    // ==================== Literals ====================

    pub fn null(&mut self) -> SpannedExpr {
        self.node(Expr::Null)
    }

    pub fn bool(&mut self, value: bool) -> SpannedExpr {
        self.node(Expr::Bool(value))
    }

    pub fn int(&mut self, value: i64) -> SpannedExpr {
        self.node(Expr::Int(value))
    }

    pub fn uint(&mut self, value: u64) -> SpannedExpr {
        self.node(Expr::UInt(value))
    }

    pub fn double(&mut self, value: f64) -> SpannedExpr {
        self.node(Expr::Double(value))
    }

    pub fn string(&mut self, value: impl Into<String>) -> SpannedExpr {
        self.node(Expr::String(value.into()))
    }

    pub fn bytes(&mut self, value: impl Into<Vec<u8>>) -> SpannedExpr {
        self.node(Expr::Bytes(value.into()))
    }

    // ==================== Access ====================

    pub fn ident(&mut self, name: impl Into<String>) -> SpannedExpr {
        self.node(Expr::Ident(name.into()))
    }

    pub fn select(&mut self, operand: SpannedExpr, field: impl Into<String>) -> SpannedExpr {
        self.node(Expr::Select {
            operand: Box::new(operand),
            field: field.into(),
            test_only: false,
            optional: false,
        })
    }

    /// `operand.?field`
    pub fn optional_select(
        &mut self,
        operand: SpannedExpr,
        field: impl Into<String>,
    ) -> SpannedExpr {
        self.node(Expr::Select {
            operand: Box::new(operand),
            field: field.into(),
            test_only: false,
            optional: true,
        })
    }

    /// `has(operand.field)`
    pub fn has(&mut self, operand: SpannedExpr, field: impl Into<String>) -> SpannedExpr {
        self.node(Expr::Select {
            operand: Box::new(operand),
            field: field.into(),
            test_only: true,
            optional: false,
        })
    }

    pub fn index(&mut self, operand: SpannedExpr, key: SpannedExpr) -> SpannedExpr {
        self.call(operators::INDEX, vec![operand, key])
    }

    // ==================== Calls ====================

    pub fn call(&mut self, function: impl Into<String>, args: Vec<SpannedExpr>) -> SpannedExpr {
        self.node(Expr::Call {
            function: function.into(),
            target: None,
            args,
        })
    }

    pub fn member_call(
        &mut self,
        function: impl Into<String>,
        target: SpannedExpr,
        args: Vec<SpannedExpr>,
    ) -> SpannedExpr {
        self.node(Expr::Call {
            function: function.into(),
            target: Some(Box::new(target)),
            args,
        })
    }

    pub fn binary(&mut self, op: &str, left: SpannedExpr, right: SpannedExpr) -> SpannedExpr {
        self.call(op, vec![left, right])
    }

    pub fn and(&mut self, left: SpannedExpr, right: SpannedExpr) -> SpannedExpr {
        self.binary(operators::LOGICAL_AND, left, right)
    }

    pub fn or(&mut self, left: SpannedExpr, right: SpannedExpr) -> SpannedExpr {
        self.binary(operators::LOGICAL_OR, left, right)
    }

    pub fn not(&mut self, operand: SpannedExpr) -> SpannedExpr {
        self.call(operators::LOGICAL_NOT, vec![operand])
    }

    pub fn conditional(
        &mut self,
        cond: SpannedExpr,
        then_expr: SpannedExpr,
        else_expr: SpannedExpr,
    ) -> SpannedExpr {
        self.call(operators::CONDITIONAL, vec![cond, then_expr, else_expr])
    }

    // ==================== Construction ====================

    pub fn list(&mut self, elements: Vec<SpannedExpr>) -> SpannedExpr {
        let elements = elements
            .into_iter()
            .map(|expr| ListElement {
                expr,
                optional: false,
            })
            .collect();
        self.node(Expr::List(elements))
    }

    /// A list literal where each element carries its own optional marker.
    pub fn list_with_optionals(&mut self, elements: Vec<(SpannedExpr, bool)>) -> SpannedExpr {
        let elements = elements
            .into_iter()
            .map(|(expr, optional)| ListElement { expr, optional })
            .collect();
        self.node(Expr::List(elements))
    }

    pub fn map(&mut self, entries: Vec<(SpannedExpr, SpannedExpr)>) -> SpannedExpr {
        let entries = entries
            .into_iter()
            .map(|(key, value)| MapEntry {
                key,
                value,
                optional: false,
            })
            .collect();
        self.node(Expr::Map(entries))
    }

    pub fn map_with_optionals(
        &mut self,
        entries: Vec<(SpannedExpr, SpannedExpr, bool)>,
    ) -> SpannedExpr {
        let entries = entries
            .into_iter()
            .map(|(key, value, optional)| MapEntry {
                key,
                value,
                optional,
            })
            .collect();
        self.node(Expr::Map(entries))
    }

    pub fn structure(
        &mut self,
        type_name: impl Into<String>,
        fields: Vec<(&str, SpannedExpr)>,
    ) -> SpannedExpr {
        let fields = fields
            .into_iter()
            .map(|(name, value)| StructField {
                name: name.to_string(),
                value,
                optional: false,
            })
            .collect();
        self.node(Expr::Struct {
            type_name: type_name.into(),
            fields,
        })
    }

    // ==================== Comprehensions ====================

    #[allow(clippy::too_many_arguments)]
    pub fn comprehension(
        &mut self,
        iter_var: impl Into<String>,
        iter_range: SpannedExpr,
        accu_var: impl Into<String>,
        accu_init: SpannedExpr,
        loop_condition: SpannedExpr,
        loop_step: SpannedExpr,
        result: SpannedExpr,
        short_circuit: bool,
    ) -> SpannedExpr {
        self.node(Expr::Comprehension {
            iter_var: iter_var.into(),
            iter_range: Box::new(iter_range),
            accu_var: accu_var.into(),
            accu_init: Box::new(accu_init),
            loop_condition: Box::new(loop_condition),
            loop_step: Box::new(loop_step),
            result: Box::new(result),
            short_circuit,
        })
    }

    /// `range.all(var, predicate)`
    pub fn all(&mut self, range: SpannedExpr, var: &str, predicate: SpannedExpr) -> SpannedExpr {
        let init = self.bool(true);
        let accu = self.ident(operators::ACCUMULATOR_VAR);
        let cond = self.call(operators::NOT_STRICTLY_FALSE, vec![accu]);
        let accu = self.ident(operators::ACCUMULATOR_VAR);
        let step = self.and(accu, predicate);
        let result = self.ident(operators::ACCUMULATOR_VAR);
        self.comprehension(
            var,
            range,
            operators::ACCUMULATOR_VAR,
            init,
            cond,
            step,
            result,
            true,
        )
    }

    /// `range.exists(var, predicate)`
    pub fn exists(&mut self, range: SpannedExpr, var: &str, predicate: SpannedExpr) -> SpannedExpr {
        let init = self.bool(false);
        let accu = self.ident(operators::ACCUMULATOR_VAR);
        let not_accu = self.not(accu);
        let cond = self.call(operators::NOT_STRICTLY_FALSE, vec![not_accu]);
        let accu = self.ident(operators::ACCUMULATOR_VAR);
        let step = self.or(accu, predicate);
        let result = self.ident(operators::ACCUMULATOR_VAR);
        self.comprehension(
            var,
            range,
            operators::ACCUMULATOR_VAR,
            init,
            cond,
            step,
            result,
            true,
        )
    }

    /// `range.exists_one(var, predicate)`
    pub fn exists_one(
        &mut self,
        range: SpannedExpr,
        var: &str,
        predicate: SpannedExpr,
    ) -> SpannedExpr {
        let init = self.int(0);
        let cond = self.bool(true);
        let accu = self.ident(operators::ACCUMULATOR_VAR);
        let one = self.int(1);
        let incremented = self.binary(operators::ADD, accu, one);
        let unchanged = self.ident(operators::ACCUMULATOR_VAR);
        let step = self.conditional(predicate, incremented, unchanged);
        let accu = self.ident(operators::ACCUMULATOR_VAR);
        let one = self.int(1);
        let result = self.binary(operators::EQUALS, accu, one);
        self.comprehension(
            var,
            range,
            operators::ACCUMULATOR_VAR,
            init,
            cond,
            step,
            result,
            false,
        )
    }

    /// `range.map(var, transform)`
    pub fn map_macro(
        &mut self,
        range: SpannedExpr,
        var: &str,
        transform: SpannedExpr,
    ) -> SpannedExpr {
        let init = self.list(Vec::new());
        let cond = self.bool(true);
        let accu = self.ident(operators::ACCUMULATOR_VAR);
        let element = self.list(vec![transform]);
        let step = self.binary(operators::ADD, accu, element);
        let result = self.ident(operators::ACCUMULATOR_VAR);
        self.comprehension(
            var,
            range,
            operators::ACCUMULATOR_VAR,
            init,
            cond,
            step,
            result,
            false,
        )
    }

    /// `range.filter(var, predicate)`
    pub fn filter(&mut self, range: SpannedExpr, var: &str, predicate: SpannedExpr) -> SpannedExpr {
        let init = self.list(Vec::new());
        let cond = self.bool(true);
        let accu = self.ident(operators::ACCUMULATOR_VAR);
        let current = self.ident(var);
        let element = self.list(vec![current]);
        let appended = self.binary(operators::ADD, accu, element);
        let unchanged = self.ident(operators::ACCUMULATOR_VAR);
        let step = self.conditional(predicate, appended, unchanged);
        let result = self.ident(operators::ACCUMULATOR_VAR);
        self.comprehension(
            var,
            range,
            operators::ACCUMULATOR_VAR,
            init,
            cond,
            step,
            result,
            false,
        )
    }

    /// `cel.bind(var, init, body)` as an explicit binding node.
    pub fn bind(&mut self, var: &str, init: SpannedExpr, body: SpannedExpr) -> SpannedExpr {
        self.node(Expr::Bind {
            var_name: var.to_string(),
            init: Box::new(init),
            body: Box::new(body),
        })
    }

    /// `cel.bind(var, init, body)` in the comprehension shape produced by
    /// macro expansion.
    pub fn bind_macro(&mut self, var: &str, init: SpannedExpr, body: SpannedExpr) -> SpannedExpr {
        let range = self.list(Vec::new());
        let cond = self.bool(false);
        let step = self.ident(var);
        self.comprehension(
            operators::UNUSED_ITER_VAR,
            range,
            var,
            init,
            cond,
            step,
            body,
            false,
        )
    }
}
