//! Type environment
//!
//! A stack of lexical name→type scopes plus flat registries for functions,
//! structs, and enums. The checker fills it during inference; it is frozen
//! by the time compilation begins, and the compiler only reads it.
//!
//! Nominal type ids are handed out here, at registration, from a per-env
//! counter. Every value constructed for a declaration reuses that id, which
//! is what makes structurally identical but distinct declarations unequal.

use crate::types::{DefLocation, Type, TypeEnum, TypeFunction, TypeStruct, TypeVariant};
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct ScopeEntry {
    ty: Type,
    #[allow(dead_code)]
    location: Option<DefLocation>,
}

/// The frozen output of type checking, consumed by the compiler.
#[derive(Debug, Clone)]
pub struct TypeEnv {
    scopes: Vec<HashMap<String, ScopeEntry>>,
    functions: HashMap<String, TypeFunction>,
    structs: HashMap<String, TypeStruct>,
    enums: HashMap<String, TypeEnum>,
    /// Reverse index: variant name → owning enum name
    variant_owners: HashMap<String, String>,
    next_type_id: i64,
}

impl TypeEnv {
    pub fn new() -> TypeEnv {
        TypeEnv {
            scopes: vec![HashMap::new()],
            functions: HashMap::new(),
            structs: HashMap::new(),
            enums: HashMap::new(),
            variant_owners: HashMap::new(),
            next_type_id: 1,
        }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn pop_scope(&mut self) {
        // The global scope is never popped
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    pub fn define(&mut self, name: impl Into<String>, ty: Type) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(
                name.into(),
                ScopeEntry {
                    ty,
                    location: None,
                },
            );
        }
    }

    pub fn define_at(&mut self, name: impl Into<String>, ty: Type, location: DefLocation) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(
                name.into(),
                ScopeEntry {
                    ty,
                    location: Some(location),
                },
            );
        }
    }

    /// Lexical lookup, innermost scope first.
    pub fn lookup(&self, name: &str) -> Option<&Type> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .map(|entry| &entry.ty)
    }

    pub fn register_function(&mut self, func: TypeFunction) {
        self.functions.insert(func.name.clone(), func);
    }

    /// Returns the registered signature even when a value binding shadows
    /// the name: the compiler consults functions separately from the
    /// lexical value scope so first-class function identifiers resolve.
    pub fn lookup_function(&self, name: &str) -> Option<&TypeFunction> {
        self.functions.get(name)
    }

    /// Register a struct declaration, assigning its nominal id.
    pub fn register_struct(
        &mut self,
        name: impl Into<String>,
        fields: Vec<(String, Type)>,
        location: DefLocation,
    ) -> i64 {
        let name = name.into();
        let type_id = self.next_type_id;
        self.next_type_id += 1;
        self.structs.insert(
            name.clone(),
            TypeStruct {
                name,
                type_id,
                fields,
                location,
            },
        );
        type_id
    }

    pub fn lookup_struct(&self, name: &str) -> Option<&TypeStruct> {
        self.structs.get(name)
    }

    /// Register an enum declaration, assigning its nominal id and indexing
    /// its variants for bare-variant lookup.
    pub fn register_enum(
        &mut self,
        name: impl Into<String>,
        variants: Vec<TypeVariant>,
        location: DefLocation,
    ) -> i64 {
        let name = name.into();
        let type_id = self.next_type_id;
        self.next_type_id += 1;
        for variant in &variants {
            self.variant_owners
                .insert(variant.name.clone(), name.clone());
        }
        self.enums.insert(
            name.clone(),
            TypeEnum {
                name,
                type_id,
                variants,
                location,
            },
        );
        type_id
    }

    pub fn lookup_enum(&self, name: &str) -> Option<&TypeEnum> {
        self.enums.get(name)
    }

    /// Find the enum owning a variant name (`Ok` → the enum declaring it).
    pub fn lookup_enum_by_variant(&self, variant: &str) -> Option<&TypeEnum> {
        let owner = self.variant_owners.get(variant)?;
        self.enums.get(owner)
    }

    /// Resolve a type name: builtins first, then user types.
    pub fn lookup_type(&self, name: &str) -> Option<Type> {
        match name {
            "Int" => Some(Type::Int),
            "Float" => Some(Type::Float),
            "String" => Some(Type::String),
            "Bool" => Some(Type::Bool),
            "None" => Some(Type::None),
            _ => {
                if self.structs.contains_key(name) {
                    Some(Type::Struct(name.to_string()))
                } else if self.enums.contains_key(name) {
                    Some(Type::Enum(name.to_string()))
                } else {
                    None
                }
            }
        }
    }
}

impl Default for TypeEnv {
    fn default() -> Self {
        TypeEnv::new()
    }
}
