//! Member tables: methods and fields reachable by selector, with promotion
//! through embedded fields
//!
//! A table is built breadth-first from a base type. Depth 0 holds the base
//! type's own methods and fields; each embedded field contributes its
//! type's members one level deeper. The shallowest member of a name wins;
//! two members of one name at the same depth make the selector ambiguous.
//!
//! Tables are memoized per type and rebuilt when any method is added
//! anywhere, since promoted methods may come from other types.

use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use tether_sdk::{is_exported, method_epoch, MethodDef, Shape, Type};

/// What a selector names
#[derive(Debug, Clone)]
pub enum MemberKind {
    /// Struct field of the given type
    Field(Type),
    /// Method declared on `owner`
    Method {
        /// The method
        def: Arc<MethodDef>,
        /// Type the method is declared on
        owner: Type,
    },
}

/// A resolved selector
#[derive(Debug, Clone)]
pub struct Member {
    /// Selector name
    pub name: String,
    /// Embedding depth (0 = declared on the base type)
    pub depth: usize,
    /// Field indices from the base value: for a field, the path to the field;
    /// for a method, the path to the embedded value holding it
    pub path: Vec<usize>,
    /// Field or method
    pub kind: MemberKind,
}

impl Member {
    /// Whether the name is exported
    pub fn is_exported(&self) -> bool {
        is_exported(&self.name)
    }
}

#[derive(Debug, Clone)]
enum Slot {
    Unique(Member),
    Ambiguous,
}

/// All selectors of one base type
#[derive(Debug, Default)]
pub struct MemberIndex {
    slots: FxHashMap<String, Slot>,
}

impl MemberIndex {
    /// Build the table for `base` (a non-pointer type)
    pub fn build(base: &Type) -> MemberIndex {
        let mut slots: FxHashMap<String, Slot> = FxHashMap::default();
        let mut visited: FxHashSet<u64> = FxHashSet::default();
        let mut level = vec![(base.clone(), Vec::<usize>::new())];
        let mut depth = 0;

        while !level.is_empty() {
            let mut found: FxHashMap<String, Vec<Member>> = FxHashMap::default();
            let mut next = Vec::new();

            for (ty, path) in level {
                let holder = strip_pointer(&ty);
                if !visited.insert(holder.id()) {
                    continue;
                }
                for def in holder.declared_methods() {
                    found.entry(def.name().to_string()).or_default().push(Member {
                        name: def.name().to_string(),
                        depth,
                        path: path.clone(),
                        kind: MemberKind::Method {
                            def,
                            owner: holder.clone(),
                        },
                    });
                }
                for (i, field) in holder.fields().iter().enumerate() {
                    let mut field_path = path.clone();
                    field_path.push(i);
                    if field.embedded {
                        next.push((field.ty.clone(), field_path.clone()));
                    }
                    found.entry(field.name.clone()).or_default().push(Member {
                        name: field.name.clone(),
                        depth,
                        path: field_path,
                        kind: MemberKind::Field(field.ty.clone()),
                    });
                }
            }

            for (name, mut members) in found {
                if slots.contains_key(&name) {
                    continue;
                }
                let slot = if members.len() == 1 {
                    Slot::Unique(members.remove(0))
                } else {
                    Slot::Ambiguous
                };
                slots.insert(name, slot);
            }
            level = next;
            depth += 1;
        }

        MemberIndex { slots }
    }

    /// Member named `name`; `None` if absent or ambiguous
    pub fn get(&self, name: &str) -> Option<&Member> {
        match self.slots.get(name) {
            Some(Slot::Unique(m)) => Some(m),
            _ => None,
        }
    }

    /// Whether `name` is ambiguous at its shallowest depth
    pub fn is_ambiguous(&self, name: &str) -> bool {
        matches!(self.slots.get(name), Some(Slot::Ambiguous))
    }

    /// Unambiguous members, in no particular order
    pub fn members(&self) -> impl Iterator<Item = &Member> {
        self.slots.values().filter_map(|s| match s {
            Slot::Unique(m) => Some(m),
            Slot::Ambiguous => None,
        })
    }
}

/// Element type of an unnamed pointer type; other types are their own base
pub fn strip_pointer(ty: &Type) -> Type {
    match ty.shape() {
        Shape::Pointer(elem) if !ty.is_named() => elem.clone(),
        _ => ty.clone(),
    }
}

type Cache = FxHashMap<u64, (u64, Arc<MemberIndex>)>;

static CACHE: Lazy<RwLock<Cache>> = Lazy::new(|| RwLock::new(FxHashMap::default()));

/// Memoized member table of `base`
pub fn index_of(base: &Type) -> Arc<MemberIndex> {
    let epoch = method_epoch();
    if let Some((built, index)) = CACHE.read().get(&base.id()) {
        if *built == epoch {
            return Arc::clone(index);
        }
    }
    tracing::trace!(ty = %base, epoch, "building member table");
    let index = Arc::new(MemberIndex::build(base));
    CACHE.write().insert(base.id(), (epoch, Arc::clone(&index)));
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_sdk::{Field, Receiver};

    fn noop(name: &str, receiver: Receiver) -> MethodDef {
        MethodDef::new(name, receiver, vec![], vec![], |_, _| Ok(vec![]))
    }

    #[test]
    fn test_shallowest_wins() {
        let inner = Type::define(
            "main",
            "Inner",
            &Type::struct_of(vec![Field::new("X", Type::int()), Field::new("Y", Type::int())]),
        );
        let outer = Type::define(
            "main",
            "Outer",
            &Type::struct_of(vec![Field::embedded(inner), Field::new("X", Type::string())]),
        );
        let index = MemberIndex::build(&outer);
        let x = index.get("X").unwrap();
        assert_eq!(x.depth, 0);
        assert_eq!(x.path, vec![1]);
        let y = index.get("Y").unwrap();
        assert_eq!(y.depth, 1);
        assert_eq!(y.path, vec![0, 1]);
        assert!(index.get("Inner").is_some());
    }

    #[test]
    fn test_equal_depth_is_ambiguous() {
        let a = Type::define("main", "A", &Type::struct_of(vec![Field::new("N", Type::int())]));
        let b = Type::define("main", "B", &Type::struct_of(vec![Field::new("N", Type::int())]));
        let c = Type::define(
            "main",
            "C",
            &Type::struct_of(vec![Field::embedded(a), Field::embedded(Type::pointer_to(&b))]),
        );
        let index = MemberIndex::build(&c);
        assert!(index.get("N").is_none());
        assert!(index.is_ambiguous("N"));
        assert!(index.get("B").is_some());
    }

    #[test]
    fn test_promoted_methods() {
        let base = Type::define("main", "Base", &Type::struct_of(vec![]));
        base.add_method(noop("Describe", Receiver::Value)).unwrap();
        base.add_method(noop("Reset", Receiver::Pointer)).unwrap();
        let outer = Type::define(
            "main",
            "Wrapper",
            &Type::struct_of(vec![Field::embedded(base.clone())]),
        );
        let index = index_of(&outer);
        let m = index.get("Reset").unwrap();
        assert_eq!(m.depth, 1);
        assert_eq!(m.path, vec![0]);
        assert!(matches!(&m.kind, MemberKind::Method { owner, .. } if *owner == base));
    }

    #[test]
    fn test_cache_invalidated_by_new_method() {
        let t = Type::define("main", "Grows", &Type::struct_of(vec![]));
        assert!(index_of(&t).get("Later").is_none());
        t.add_method(noop("Later", Receiver::Value)).unwrap();
        assert!(index_of(&t).get("Later").is_some());
    }
}
