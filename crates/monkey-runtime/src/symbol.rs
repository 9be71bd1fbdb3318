//! Symbol table and name binding
//!
//! One table per lexical function scope. The outermost table binds globals
//! (and builtins); every enclosed table binds frame-relative locals and
//! chains to the table it was created from.

use std::collections::HashMap;

/// Where a binding lives at runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolScope {
    /// Slot in the global array
    Global,
    /// Frame-relative stack slot
    Local,
    /// Index into the builtin table
    Builtin,
}

/// A resolved binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub scope: SymbolScope,
    pub index: usize,
}

/// Chained symbol table for name resolution
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    /// Enclosing function's table, `None` for the global table
    outer: Option<Box<SymbolTable>>,
    store: HashMap<String, Symbol>,
    /// Dense slots handed out so far
    num_definitions: usize,
}

impl SymbolTable {
    /// Create an empty global table
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a local table chained to `outer`
    pub fn new_enclosed(outer: SymbolTable) -> Self {
        Self {
            outer: Some(Box::new(outer)),
            store: HashMap::new(),
            num_definitions: 0,
        }
    }

    /// Recover the enclosing table when leaving a function scope
    ///
    /// Returns `None` for the global table.
    pub fn into_outer(self) -> Option<SymbolTable> {
        self.outer.map(|outer| *outer)
    }

    pub fn is_global(&self) -> bool {
        self.outer.is_none()
    }

    /// Bind `name` to the next free slot
    ///
    /// Redefining a name in the same table shadows the old binding with a new slot.
    pub fn define(&mut self, name: &str) -> Symbol {
        let scope = if self.is_global() {
            SymbolScope::Global
        } else {
            SymbolScope::Local
        };
        let symbol = Symbol {
            name: name.to_string(),
            scope,
            index: self.num_definitions,
        };
        self.num_definitions += 1;
        self.store.insert(name.to_string(), symbol.clone());
        symbol
    }

    /// Bind `name` to a fixed builtin index without consuming a slot
    pub fn define_builtin(&mut self, index: usize, name: &str) -> Symbol {
        let symbol = Symbol {
            name: name.to_string(),
            scope: SymbolScope::Builtin,
            index,
        };
        self.store.insert(name.to_string(), symbol.clone());
        symbol
    }

    /// Look a name up here, then in each enclosing table
    pub fn resolve(&self, name: &str) -> Option<Symbol> {
        match self.store.get(name) {
            Some(symbol) => Some(symbol.clone()),
            None => self.outer.as_ref()?.resolve(name),
        }
    }

    /// Whether this table itself binds `name`
    pub fn defines_locally(&self, name: &str) -> bool {
        self.store.contains_key(name)
    }

    pub fn num_definitions(&self) -> usize {
        self.num_definitions
    }

    /// Names bound to slots in this table, ordered by slot
    pub fn defined_names(&self) -> Vec<String> {
        let mut symbols: Vec<&Symbol> = self
            .store
            .values()
            .filter(|s| s.scope != SymbolScope::Builtin)
            .collect();
        symbols.sort_by_key(|s| s.index);
        symbols.into_iter().map(|s| s.name.clone()).collect()
    }
}
