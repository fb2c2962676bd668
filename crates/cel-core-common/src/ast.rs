//! CEL Abstract Syntax Tree definitions.
//!
//! These are the node shapes the front end (parser plus macro expansion)
//! hands to the runtime planner. Operators are plain [`Expr::Call`] nodes
//! whose function names come from [`crate::operators`].

/// Source span for error reporting.
/// Uses byte offsets into the source string.
pub type Span = std::ops::Range<usize>;

/// Stable numeric id of an AST node, used for error attribution.
pub type ExprId = i64;

/// AST node with source location and unique ID.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    /// Unique identifier for this node (1-indexed, assigned by the front end)
    pub id: ExprId,
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(id: ExprId, node: T, span: Span) -> Self {
        Self { id, node, span }
    }
}

/// A spanned expression.
pub type SpannedExpr = Spanned<Expr>;

/// A list element that may be optional.
#[derive(Debug, Clone, PartialEq)]
pub struct ListElement {
    pub expr: SpannedExpr,
    pub optional: bool,
}

/// A map entry that may be optional.
#[derive(Debug, Clone, PartialEq)]
pub struct MapEntry {
    pub key: SpannedExpr,
    pub value: SpannedExpr,
    pub optional: bool,
}

/// A struct field that may be optional.
#[derive(Debug, Clone, PartialEq)]
pub struct StructField {
    pub name: String,
    pub value: SpannedExpr,
    pub optional: bool,
}

/// CEL expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    // Literals
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),

    // Identifiers
    Ident(String),

    /// Field selection `operand.field`.
    ///
    /// `test_only` marks the expansion of `has(operand.field)`; `optional`
    /// marks `operand.?field`.
    Select {
        operand: Box<SpannedExpr>,
        field: String,
        test_only: bool,
        optional: bool,
    },

    /// Function or operator call. `target` is set for receiver-style calls
    /// (`target.function(args)`).
    Call {
        function: String,
        target: Option<Box<SpannedExpr>>,
        args: Vec<SpannedExpr>,
    },

    // Collections
    List(Vec<ListElement>),
    Map(Vec<MapEntry>),

    /// Struct/message literal: `TypeName{field: value, ...}` with the type
    /// name already resolved to its qualified form.
    Struct {
        type_name: String,
        fields: Vec<StructField>,
    },

    /// Comprehension expression (result of macro expansion).
    ///
    /// Semantics:
    /// ```text
    /// let accu_var = accu_init
    /// for (let iter_var in iter_range) {
    ///    if (!loop_condition) { break }
    ///    accu_var = loop_step
    /// }
    /// return result
    /// ```
    Comprehension {
        /// The name of the iteration variable.
        iter_var: String,
        /// The range over which the comprehension iterates.
        iter_range: Box<SpannedExpr>,
        /// The name of the accumulator variable.
        accu_var: String,
        /// The initial value of the accumulator.
        accu_init: Box<SpannedExpr>,
        /// Returns false when the result has been computed.
        loop_condition: Box<SpannedExpr>,
        /// Computes the next value of the accumulator.
        loop_step: Box<SpannedExpr>,
        /// Computes the final result from the accumulator.
        result: Box<SpannedExpr>,
        /// Whether a false `loop_condition` may end the loop early.
        short_circuit: bool,
    },

    /// Local binding (`cel.bind(var_name, init, body)`).
    Bind {
        var_name: String,
        init: Box<SpannedExpr>,
        body: Box<SpannedExpr>,
    },

    /// Placeholder for parse errors (enables partial AST).
    Error,
}

impl Expr {
    /// Returns true if this is a call to `function` with no target.
    pub fn is_global_call(&self, function: &str) -> bool {
        matches!(self, Expr::Call { function: f, target: None, .. } if f == function)
    }

    /// Returns true if this node is a literal constant.
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            Expr::Null
                | Expr::Bool(_)
                | Expr::Int(_)
                | Expr::UInt(_)
                | Expr::Double(_)
                | Expr::String(_)
                | Expr::Bytes(_)
        )
    }

    /// The dotted name spelled by an identifier or a chain of plain selects,
    /// e.g. `a.b.c`. Returns `None` for anything else.
    pub fn qualified_name(&self) -> Option<String> {
        match self {
            Expr::Ident(name) => Some(name.clone()),
            Expr::Select {
                operand,
                field,
                test_only: false,
                optional: false,
            } => operand
                .node
                .qualified_name()
                .map(|prefix| format!("{}.{}", prefix, field)),
            _ => None,
        }
    }
}

impl SpannedExpr {
    /// Maximum nesting depth of this expression tree. Leaves have depth 1.
    pub fn depth(&self) -> usize {
        let children = self.children();
        1 + children.iter().map(|c| c.depth()).max().unwrap_or(0)
    }

    /// Direct children in evaluation order.
    pub fn children(&self) -> Vec<&SpannedExpr> {
        match &self.node {
            Expr::Select { operand, .. } => vec![operand.as_ref()],
            Expr::Call { target, args, .. } => target
                .iter()
                .map(|t| t.as_ref())
                .chain(args.iter())
                .collect(),
            Expr::List(elements) => elements.iter().map(|e| &e.expr).collect(),
            Expr::Map(entries) => entries
                .iter()
                .flat_map(|e| [&e.key, &e.value])
                .collect(),
            Expr::Struct { fields, .. } => fields.iter().map(|f| &f.value).collect(),
            Expr::Comprehension {
                iter_range,
                accu_init,
                loop_condition,
                loop_step,
                result,
                ..
            } => vec![
                iter_range.as_ref(),
                accu_init.as_ref(),
                loop_condition.as_ref(),
                loop_step.as_ref(),
                result.as_ref(),
            ],
            Expr::Bind { init, body, .. } => vec![init.as_ref(), body.as_ref()],
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn node(id: ExprId, expr: Expr) -> SpannedExpr {
        Spanned::new(id, expr, 0..0)
    }

    #[test]
    fn test_qualified_name() {
        let expr = node(
            3,
            Expr::Select {
                operand: Box::new(node(
                    2,
                    Expr::Select {
                        operand: Box::new(node(1, Expr::Ident("a".into()))),
                        field: "b".into(),
                        test_only: false,
                        optional: false,
                    },
                )),
                field: "c".into(),
                test_only: false,
                optional: false,
            },
        );
        assert_eq!(expr.node.qualified_name(), Some("a.b.c".to_string()));
    }

    #[test]
    fn test_qualified_name_stops_at_has() {
        let expr = node(
            2,
            Expr::Select {
                operand: Box::new(node(1, Expr::Ident("a".into()))),
                field: "b".into(),
                test_only: true,
                optional: false,
            },
        );
        assert_eq!(expr.node.qualified_name(), None);
    }

    #[test]
    fn test_depth() {
        let leaf = node(1, Expr::Int(1));
        assert_eq!(leaf.depth(), 1);

        let call = node(
            3,
            Expr::Call {
                function: "_+_".into(),
                target: None,
                args: vec![leaf.clone(), node(2, Expr::Int(2))],
            },
        );
        assert_eq!(call.depth(), 2);
    }
}
