//! Value Box Module
//!
//! Type-erased container for one structured value. The box records a runtime
//! type tag next to the payload so typed retrieval can fail precisely with
//! `TypeMismatch` instead of reinterpreting foreign data.

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::sync::Arc;

use crate::error::{CacheError, Result};

// == Type Tag ==
/// Runtime identity of a boxed payload's type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeTag {
    id: TypeId,
    name: &'static str,
}

impl TypeTag {
    /// Tag for the type `T`.
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// Fully qualified type name, for diagnostics and host introspection.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn matches<T: Any>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

// == Payload Storage ==
/// Object-safe view of an owned payload that can deep-copy itself.
trait Payload: Any + Send + Sync {
    fn clone_payload(&self) -> Box<dyn Payload>;
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any + Clone + Send + Sync> Payload for T {
    fn clone_payload(&self) -> Box<dyn Payload> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

enum Storage {
    /// Payload owned by the box; clones deep-copy it
    Owned(Box<dyn Payload>),
    /// Externally owned payload; clones share the handle
    Shared(Arc<dyn Any + Send + Sync>),
}

impl Clone for Storage {
    fn clone(&self) -> Self {
        match self {
            Storage::Owned(payload) => Storage::Owned(payload.as_ref().clone_payload()),
            Storage::Shared(handle) => Storage::Shared(Arc::clone(handle)),
        }
    }
}

// == Value Box ==
/// Holds exactly one value of any `'static` type.
///
/// The engine never looks inside a box; equality of payloads is the caller's
/// business.
#[derive(Clone)]
pub struct ValueBox {
    tag: TypeTag,
    storage: Storage,
}

impl ValueBox {
    // == Constructors ==
    /// Boxes an owned value. Cloning the box clones the value.
    pub fn new<T: Any + Clone + Send + Sync>(value: T) -> Self {
        Self {
            tag: TypeTag::of::<T>(),
            storage: Storage::Owned(Box::new(value)),
        }
    }

    /// Boxes an externally owned value. Cloning the box only clones the
    /// handle, so every clone observes the same object.
    pub fn shared<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self {
            tag: TypeTag::of::<T>(),
            storage: Storage::Shared(value),
        }
    }

    // == Introspection ==
    pub fn tag(&self) -> TypeTag {
        self.tag
    }

    /// Name of the stored type.
    pub fn type_name(&self) -> &'static str {
        self.tag.name()
    }

    /// Returns true if the stored value is a `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.tag.matches::<T>()
    }

    /// Returns true if the payload is externally owned.
    pub fn is_shared(&self) -> bool {
        matches!(self.storage, Storage::Shared(_))
    }

    // == Typed Access ==
    /// Borrows the payload as a `T`.
    ///
    /// # Errors
    /// `TypeMismatch` if the box holds a different type.
    pub fn downcast_ref<T: Any>(&self) -> Result<&T> {
        if !self.is::<T>() {
            return Err(self.mismatch::<T>());
        }

        let any: &dyn Any = match &self.storage {
            Storage::Owned(payload) => payload.as_ref().as_any(),
            Storage::Shared(handle) => handle.as_ref(),
        };
        any.downcast_ref::<T>().ok_or_else(|| self.mismatch::<T>())
    }

    /// Clones the payload out as a `T`.
    pub fn get_cloned<T: Any + Clone>(&self) -> Result<T> {
        self.downcast_ref::<T>().cloned()
    }

    fn mismatch<T: Any>(&self) -> CacheError {
        CacheError::TypeMismatch {
            expected: type_name::<T>(),
            found: self.tag.name(),
        }
    }
}

impl fmt::Debug for ValueBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueBox")
            .field("type", &self.tag.name())
            .field("shared", &self.is_shared())
            .finish()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Inventory {
        gold: u32,
        items: Vec<String>,
    }

    #[test]
    fn test_box_roundtrip_struct() {
        let inventory = Inventory {
            gold: 42,
            items: vec!["sword".to_string()],
        };
        let boxed = ValueBox::new(inventory.clone());

        assert!(boxed.is::<Inventory>());
        assert!(!boxed.is_shared());
        assert_eq!(boxed.downcast_ref::<Inventory>().unwrap(), &inventory);
    }

    #[test]
    fn test_type_mismatch() {
        let boxed = ValueBox::new(7_i32);

        let err = boxed.downcast_ref::<i64>().unwrap_err();
        assert_eq!(
            err,
            CacheError::TypeMismatch {
                expected: "i64",
                found: "i32",
            }
        );
        // Box is still usable with the right type
        assert_eq!(boxed.get_cloned::<i32>().unwrap(), 7);
    }

    #[test]
    fn test_owned_clone_is_deep() {
        let boxed = ValueBox::new(vec![1, 2, 3]);
        let copy = boxed.clone();

        let a = boxed.downcast_ref::<Vec<i32>>().unwrap();
        let b = copy.downcast_ref::<Vec<i32>>().unwrap();
        assert_eq!(a, b);
        assert!(!std::ptr::eq(a, b));
    }

    #[test]
    fn test_shared_clone_is_shallow() {
        let original = Arc::new(String::from("level-data"));
        let boxed = ValueBox::shared(Arc::clone(&original));
        let copy = boxed.clone();

        assert!(boxed.is_shared());
        let a = boxed.downcast_ref::<String>().unwrap();
        let b = copy.downcast_ref::<String>().unwrap();
        assert!(std::ptr::eq(a, b));
        assert!(std::ptr::eq(a, original.as_ref()));
        assert_eq!(Arc::strong_count(&original), 3);
    }

    #[test]
    fn test_type_name_introspection() {
        let boxed = ValueBox::new(serde_json::json!({"hp": 10}));
        assert_eq!(boxed.type_name(), type_name::<serde_json::Value>());
        assert_eq!(boxed.tag(), TypeTag::of::<serde_json::Value>());
    }

    #[test]
    fn test_debug_does_not_require_payload_debug() {
        struct Opaque;
        impl Clone for Opaque {
            fn clone(&self) -> Self {
                Opaque
            }
        }

        let boxed = ValueBox::new(Opaque);
        let rendered = format!("{:?}", boxed);
        assert!(rendered.contains("Opaque"));
    }
}
