//! Plan-time name resolution for comprehension and bind variables.

/// Where a local variable lives at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Binding {
    /// A slot that is always assigned while the variable is in scope.
    Slot(usize),
    /// A slot filled on first reference by calling a subexpression.
    Lazy { slot: usize, subexpression: usize },
}

/// Stack of local variables; inner declarations shadow outer ones.
#[derive(Debug, Default)]
pub(super) struct Scopes {
    entries: Vec<(String, Binding)>,
}

impl Scopes {
    pub(super) fn push(&mut self, name: &str, binding: Binding) {
        self.entries.push((name.to_string(), binding));
    }

    pub(super) fn pop(&mut self) {
        self.entries.pop();
    }

    pub(super) fn lookup(&self, name: &str) -> Option<Binding> {
        self.entries
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, binding)| *binding)
    }

    /// True if the first segment of a dotted name is a local variable.
    pub(super) fn shadows(&self, qualified_name: &str) -> bool {
        let root = qualified_name.split('.').next().unwrap_or(qualified_name);
        self.lookup(root).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_inner_scope_shadows_outer() {
        let mut scopes = Scopes::default();
        scopes.push("x", Binding::Slot(0));
        scopes.push("x", Binding::Lazy {
            slot: 1,
            subexpression: 0,
        });
        assert_eq!(
            scopes.lookup("x"),
            Some(Binding::Lazy {
                slot: 1,
                subexpression: 0
            })
        );
        scopes.pop();
        assert_eq!(scopes.lookup("x"), Some(Binding::Slot(0)));
        assert!(scopes.shadows("x.y.z"));
        assert!(!scopes.shadows("y.x"));
    }
}
