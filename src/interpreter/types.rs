use crate::ast::FunctionDef;
use crate::regexp::Regex;
use crate::types::{JsObject, JsValue};
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;

/// Language-level failure: the thrown value.
pub type JsResult<T> = Result<T, JsValue>;

#[derive(Debug)]
pub enum Completion {
    /// `None` is the empty completion value.
    Normal(Option<JsValue>),
    Return(JsValue),
    Throw(JsValue),
    Break(Option<String>, Option<JsValue>),
    Continue(Option<String>, Option<JsValue>),
}

impl Completion {
    pub fn normal(value: JsValue) -> Self {
        Completion::Normal(Some(value))
    }

    pub(crate) fn is_abrupt(&self) -> bool {
        !matches!(self, Completion::Normal(_))
    }

    /// The completion's value slot, if it carries one.
    pub(crate) fn value(&self) -> Option<&JsValue> {
        match self {
            Completion::Normal(v) | Completion::Break(_, v) | Completion::Continue(_, v) => {
                v.as_ref()
            }
            Completion::Return(v) | Completion::Throw(v) => Some(v),
        }
    }

    /// Fills an empty value slot with `v` (statement-list value threading).
    pub(crate) fn update_empty(self, v: Option<JsValue>) -> Self {
        match self {
            Completion::Normal(None) => Completion::Normal(v),
            Completion::Break(l, None) => Completion::Break(l, v),
            Completion::Continue(l, None) => Completion::Continue(l, v),
            other => other,
        }
    }
}

impl From<JsResult<JsValue>> for Completion {
    fn from(r: JsResult<JsValue>) -> Self {
        match r {
            Ok(v) => Completion::Normal(Some(v)),
            Err(e) => Completion::Throw(e),
        }
    }
}

pub type EnvRef = Rc<RefCell<Environment>>;

/// A lexical environment: one record plus its outer link.
#[derive(Debug)]
pub struct Environment {
    pub(crate) record: EnvironmentRecord,
    pub(crate) parent: Option<EnvRef>,
}

#[derive(Debug)]
pub enum EnvironmentRecord {
    Declarative(FxHashMap<String, Binding>),
    Object { object: JsObject, provide_this: bool },
}

#[derive(Debug, Clone)]
pub(crate) struct Binding {
    pub(crate) value: JsValue,
    pub(crate) state: BindingState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BindingState {
    MutableDeletable,
    MutableUndeletable,
    ImmutableInitialized,
    ImmutableUninitialized,
}

impl Environment {
    pub fn new_declarative(parent: Option<EnvRef>) -> EnvRef {
        Rc::new(RefCell::new(Environment {
            record: EnvironmentRecord::Declarative(FxHashMap::default()),
            parent,
        }))
    }

    pub fn new_object(object: JsObject, provide_this: bool, parent: Option<EnvRef>) -> EnvRef {
        Rc::new(RefCell::new(Environment {
            record: EnvironmentRecord::Object {
                object,
                provide_this,
            },
            parent,
        }))
    }

    /// Declarative-only binding creation used while instantiating declarations.
    pub(crate) fn declare(&mut self, name: &str, state: BindingState, value: JsValue) {
        if let EnvironmentRecord::Declarative(bindings) = &mut self.record {
            bindings.insert(name.to_string(), Binding { value, state });
        }
    }

    pub(crate) fn create_immutable_binding(&mut self, name: &str) {
        self.declare(name, BindingState::ImmutableUninitialized, JsValue::Undefined);
    }

    pub(crate) fn initialize_immutable_binding(&mut self, name: &str, value: JsValue) {
        match &mut self.record {
            EnvironmentRecord::Declarative(bindings) => match bindings.get_mut(name) {
                Some(b) if b.state == BindingState::ImmutableUninitialized => {
                    b.value = value;
                    b.state = BindingState::ImmutableInitialized;
                }
                _ => panic!("no uninitialized immutable binding for {name}"),
            },
            EnvironmentRecord::Object { .. } => panic!("immutable binding {name} in an object environment"),
        }
    }
}

pub type NativeFn = Rc<dyn Fn(&mut super::Interpreter, &JsValue, &[JsValue]) -> Completion>;

pub enum JsFunction {
    User {
        def: Rc<FunctionDef>,
        scope: EnvRef,
        strict: bool,
    },
    Native {
        name: String,
        arity: usize,
        call: NativeFn,
        /// `None` for built-ins that are not constructors.
        construct: Option<NativeFn>,
    },
    Bound {
        target: JsObject,
        this: JsValue,
        args: Vec<JsValue>,
    },
}

impl JsFunction {
    pub fn native(
        name: impl Into<String>,
        arity: usize,
        f: impl Fn(&mut super::Interpreter, &JsValue, &[JsValue]) -> Completion + 'static,
    ) -> Self {
        JsFunction::Native {
            name: name.into(),
            arity,
            call: Rc::new(f),
            construct: None,
        }
    }

    pub fn native_constructor(
        name: impl Into<String>,
        arity: usize,
        call: impl Fn(&mut super::Interpreter, &JsValue, &[JsValue]) -> Completion + 'static,
        construct: impl Fn(&mut super::Interpreter, &JsValue, &[JsValue]) -> Completion + 'static,
    ) -> Self {
        JsFunction::Native {
            name: name.into(),
            arity,
            call: Rc::new(call),
            construct: Some(Rc::new(construct)),
        }
    }

    pub fn is_strict(&self) -> bool {
        matches!(self, JsFunction::User { strict: true, .. })
    }
}

impl Clone for JsFunction {
    fn clone(&self) -> Self {
        match self {
            JsFunction::User { def, scope, strict } => JsFunction::User {
                def: def.clone(),
                scope: scope.clone(),
                strict: *strict,
            },
            JsFunction::Native {
                name,
                arity,
                call,
                construct,
            } => JsFunction::Native {
                name: name.clone(),
                arity: *arity,
                call: call.clone(),
                construct: construct.clone(),
            },
            JsFunction::Bound { target, this, args } => JsFunction::Bound {
                target: *target,
                this: this.clone(),
                args: args.clone(),
            },
        }
    }
}

impl std::fmt::Debug for JsFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JsFunction::User { def, .. } => write!(f, "JsFunction::User({:?})", def.name),
            JsFunction::Native { name, arity, .. } => {
                write!(f, "JsFunction::Native({name:?}, {arity})")
            }
            JsFunction::Bound { target, .. } => write!(f, "JsFunction::Bound({})", target.id),
        }
    }
}

/// A property descriptor. While a descriptor is being specified every field may
/// be absent; `get`/`set` are tri-state: `None` (not given), `Some(Undefined)`
/// (given as undefined) or `Some(function)`. Stored descriptors are complete.
#[derive(Debug, Clone, Default)]
pub struct PropertyDescriptor {
    pub value: Option<JsValue>,
    pub writable: Option<bool>,
    pub get: Option<JsValue>,
    pub set: Option<JsValue>,
    pub enumerable: Option<bool>,
    pub configurable: Option<bool>,
}

impl PropertyDescriptor {
    pub fn data(value: JsValue, writable: bool, enumerable: bool, configurable: bool) -> Self {
        Self {
            value: Some(value),
            writable: Some(writable),
            get: None,
            set: None,
            enumerable: Some(enumerable),
            configurable: Some(configurable),
        }
    }

    pub fn data_default(value: JsValue) -> Self {
        Self::data(value, true, true, true)
    }

    pub fn accessor(get: JsValue, set: JsValue, enumerable: bool, configurable: bool) -> Self {
        Self {
            value: None,
            writable: None,
            get: Some(get),
            set: Some(set),
            enumerable: Some(enumerable),
            configurable: Some(configurable),
        }
    }

    pub fn is_data_descriptor(&self) -> bool {
        self.value.is_some() || self.writable.is_some()
    }

    pub fn is_accessor_descriptor(&self) -> bool {
        self.get.is_some() || self.set.is_some()
    }

    pub fn is_generic_descriptor(&self) -> bool {
        !self.is_data_descriptor() && !self.is_accessor_descriptor()
    }

    pub fn is_empty(&self) -> bool {
        self.is_generic_descriptor() && self.enumerable.is_none() && self.configurable.is_none()
    }

    pub fn enumerable(&self) -> bool {
        self.enumerable == Some(true)
    }

    pub fn configurable(&self) -> bool {
        self.configurable == Some(true)
    }

    pub fn writable(&self) -> bool {
        self.writable == Some(true)
    }

    /// Fields of `desc` laid over `self`, the rest of a stored descriptor
    /// switching shape when `desc` names the other kind.
    pub(crate) fn merged(&self, desc: &PropertyDescriptor) -> PropertyDescriptor {
        let mut out = self.clone();
        if self.is_data_descriptor() && desc.is_accessor_descriptor() {
            out.value = None;
            out.writable = None;
            out.get = Some(JsValue::Undefined);
            out.set = Some(JsValue::Undefined);
        } else if self.is_accessor_descriptor() && desc.is_data_descriptor() {
            out.get = None;
            out.set = None;
            out.value = Some(JsValue::Undefined);
            out.writable = Some(false);
        }
        if let Some(v) = &desc.value {
            out.value = Some(v.clone());
        }
        if let Some(w) = desc.writable {
            out.writable = Some(w);
        }
        if let Some(g) = &desc.get {
            out.get = Some(g.clone());
        }
        if let Some(s) = &desc.set {
            out.set = Some(s.clone());
        }
        if let Some(e) = desc.enumerable {
            out.enumerable = Some(e);
        }
        if let Some(c) = desc.configurable {
            out.configurable = Some(c);
        }
        out
    }

    /// A new property created from a partial descriptor gets default attributes.
    pub(crate) fn completed(&self) -> PropertyDescriptor {
        if self.is_accessor_descriptor() {
            PropertyDescriptor::accessor(
                self.get.clone().unwrap_or(JsValue::Undefined),
                self.set.clone().unwrap_or(JsValue::Undefined),
                self.enumerable(),
                self.configurable(),
            )
        } else {
            PropertyDescriptor::data(
                self.value.clone().unwrap_or(JsValue::Undefined),
                self.writable(),
                self.enumerable(),
                self.configurable(),
            )
        }
    }
}

pub struct JsObjectData {
    pub id: Option<u64>,
    pub properties: FxHashMap<String, PropertyDescriptor>,
    pub property_order: Vec<String>,
    pub prototype: Option<JsObject>,
    pub callable: Option<JsFunction>,
    pub class_name: String,
    pub extensible: bool,
    pub primitive_value: Option<JsValue>,
    /// Non-strict arguments objects: index key to the aliased parameter binding.
    pub parameter_map: Option<FxHashMap<String, (EnvRef, String)>>,
    pub regexp: Option<Rc<Regex>>,
}

impl JsObjectData {
    pub(crate) fn new() -> Self {
        Self {
            id: None,
            properties: FxHashMap::default(),
            property_order: Vec::new(),
            prototype: None,
            callable: None,
            class_name: "Object".to_string(),
            extensible: true,
            primitive_value: None,
            parameter_map: None,
            regexp: None,
        }
    }

    pub(crate) fn with_class(class_name: &str, prototype: Option<JsObject>) -> Self {
        let mut data = Self::new();
        data.class_name = class_name.to_string();
        data.prototype = prototype;
        data
    }

    pub fn get_own_property(&self, key: &str) -> Option<&PropertyDescriptor> {
        self.properties.get(key)
    }

    pub fn is_callable(&self) -> bool {
        self.callable.is_some()
    }

    pub fn insert_property(&mut self, key: String, desc: PropertyDescriptor) {
        if !self.properties.contains_key(&key) {
            self.property_order.push(key.clone());
        }
        self.properties.insert(key, desc);
    }

    pub fn insert_value(&mut self, key: String, value: JsValue) {
        self.insert_property(key, PropertyDescriptor::data_default(value));
    }

    /// Writable, non-enumerable, configurable: the attributes of built-in methods.
    pub fn insert_builtin(&mut self, key: String, value: JsValue) {
        self.insert_property(key, PropertyDescriptor::data(value, true, false, true));
    }

    /// Read-only, non-enumerable, non-configurable constant.
    pub fn insert_constant(&mut self, key: String, value: JsValue) {
        self.insert_property(key, PropertyDescriptor::data(value, false, false, false));
    }

    pub fn remove_property(&mut self, key: &str) -> Option<PropertyDescriptor> {
        let removed = self.properties.remove(key);
        if removed.is_some()
            && let Some(pos) = self.property_order.iter().rposition(|k| k == key)
        {
            self.property_order.remove(pos);
        }
        removed
    }

    pub fn get_property_value(&self, key: &str) -> Option<JsValue> {
        self.properties.get(key).and_then(|d| d.value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merged_switches_shape() {
        let data = PropertyDescriptor::data(JsValue::Number(1.0), true, true, true);
        let acc = PropertyDescriptor {
            get: Some(JsValue::Undefined),
            ..Default::default()
        };
        let m = data.merged(&acc);
        assert!(m.is_accessor_descriptor());
        assert!(!m.is_data_descriptor());
        assert_eq!(m.enumerable, Some(true));
        assert!(matches!(m.set, Some(JsValue::Undefined)));
    }

    #[test]
    fn completed_defaults_to_false_attributes() {
        let partial = PropertyDescriptor {
            value: Some(JsValue::Number(3.0)),
            ..Default::default()
        };
        let full = partial.completed();
        assert_eq!(full.writable, Some(false));
        assert_eq!(full.enumerable, Some(false));
        assert_eq!(full.configurable, Some(false));
        assert!(PropertyDescriptor::default().is_empty());
    }

    #[test]
    fn completion_threads_empty_values() {
        let c = Completion::Normal(None).update_empty(Some(JsValue::Number(1.0)));
        assert!(matches!(c, Completion::Normal(Some(JsValue::Number(n))) if n == 1.0));
        let c = Completion::Break(None, None).update_empty(Some(JsValue::Null));
        assert!(matches!(c, Completion::Break(None, Some(JsValue::Null))));
        let c = Completion::Normal(Some(JsValue::Boolean(true))).update_empty(None);
        assert!(matches!(c, Completion::Normal(Some(JsValue::Boolean(true)))));
    }

    #[test]
    fn remove_property_keeps_order() {
        let mut o = JsObjectData::new();
        o.insert_value("a".into(), JsValue::Null);
        o.insert_value("b".into(), JsValue::Null);
        o.insert_value("c".into(), JsValue::Null);
        o.remove_property("b");
        assert_eq!(o.property_order, vec!["a", "c"]);
        o.insert_value("b".into(), JsValue::Null);
        assert_eq!(o.property_order, vec!["a", "c", "b"]);
    }
}
