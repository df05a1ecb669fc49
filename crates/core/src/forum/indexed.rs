//! The update/submit protocol shared by every forum entity.
//!
//! An entity exposes two verbs. [`Indexed::update`] brings local state in line
//! with the server, [`Indexed::submit`] pushes local state to it. Both take an
//! optional method name selecting the server action, plus keyword overrides:
//! keys naming a field of the entity are written into it before dispatch, the
//! rest become arguments of the selected handler.
//!
//! Method names are public API and stay strings at the call site, but each
//! entity declares its methods as a closed enum, so the handler table is
//! checked by the compiler.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::session::{SessionResolver, UsesSession, registry};

/// Keyword arguments of [`Indexed::update`] and [`Indexed::submit`].
pub type Kwargs = serde_json::Map<String, Value>;

/// Builds [`Kwargs`] from a JSON object. Anything else yields no arguments.
///
/// ```ignore
/// message.submit(Some("edit"), kwargs(json!({"content": "fixed", "reason": "typo"})))?;
/// ```
pub fn kwargs(value: Value) -> Kwargs {
    match value {
        Value::Object(map) => map,
        _ => Kwargs::new(),
    }
}

/// A closed set of method names an entity accepts for one verb.
pub trait Method: Copy + Sized + 'static {
    /// Every method, in declaration order.
    const ALL: &'static [Self];

    /// The name callers select this method by.
    fn name(self) -> &'static str;

    fn parse(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|method| method.name() == name)
    }
}

/// The method set of a verb an entity does not support at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoMethod {}

impl Method for NoMethod {
    const ALL: &'static [Self] = &[];

    fn name(self) -> &'static str {
        match self {}
    }
}

/// Declares a method enum and its [`Method`] impl.
macro_rules! methods {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $value:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
        }

        impl $crate::forum::Method for $name {
            const ALL: &'static [Self] = &[$( Self::$variant, )+];

            fn name(self) -> &'static str {
                match self {
                    $( Self::$variant => $value, )+
                }
            }
        }
    };
}

pub(crate) use methods;

/// Copies every `Some` field of `$source` over `$target`.
macro_rules! merge_fields {
    ($target:expr, $source:expr; $($field:ident),+ $(,)?) => {
        $(
            if let Some(value) = $source.$field {
                $target.$field = Some(value);
            }
        )+
    };
}

pub(crate) use merge_fields;

/// Arguments left for a handler once field overrides were applied.
#[derive(Debug)]
pub struct HandlerArgs {
    entity: &'static str,
    method: &'static str,
    rest: Kwargs,
}

impl HandlerArgs {
    pub fn new(entity: &'static str, method: &'static str, rest: Kwargs) -> Self {
        Self { entity, method, rest }
    }

    /// Removes argument `name`, deserialized. `null` counts as absent.
    pub fn take<T: DeserializeOwned>(&mut self, name: &str) -> Result<Option<T>> {
        match self.rest.remove(name) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
        }
    }

    /// Fails if arguments the handler did not take are left.
    pub fn finish(self) -> Result<()> {
        if self.rest.is_empty() {
            return Ok(());
        }
        Err(Error::UnexpectedArguments {
            entity: self.entity,
            method: self.method,
            names: self.rest.into_iter().map(|(name, _)| name).collect(),
        })
    }
}

/// The update/submit protocol.
///
/// Implementors provide the field list, method sets and the two dispatch
/// functions; the verbs themselves are provided. Handlers check required
/// fields with [`require!`](crate::error) before resolving a session, so an
/// incomplete entity never touches the network.
pub trait Indexed: UsesSession + Clone + Serialize + DeserializeOwned {
    /// Entity name used in errors.
    const ENTITY: &'static str;
    /// Serialized names of the fields keyword overrides may set.
    const FIELDS: &'static [&'static str];
    /// Method used by [`update`](Self::update) when none is given.
    const DEFAULT_UPDATE: &'static str = "get";
    /// Method used by [`submit`](Self::submit) when none is given.
    const DEFAULT_SUBMIT: &'static str = "post";

    type UpdateMethod: Method;
    type SubmitMethod: Method;

    fn dispatch_update(&self, method: Self::UpdateMethod, resolver: &dyn SessionResolver, args: HandlerArgs) -> Result<Self>;

    fn dispatch_submit(&self, method: Self::SubmitMethod, resolver: &dyn SessionResolver, args: HandlerArgs) -> Result<Self>;

    /// Refreshes this entity from the server using the ambient session.
    ///
    /// On success `self` is replaced by the server state, which is also
    /// returned. On failure `self` keeps its fields, including any overrides
    /// applied from `kwargs`.
    fn update(&mut self, method: Option<&str>, kwargs: Kwargs) -> Result<Self> {
        self.update_in(registry(), method, kwargs)
    }

    /// [`update`](Self::update) with an explicit session resolver.
    fn update_in(&mut self, resolver: &dyn SessionResolver, method: Option<&str>, kwargs: Kwargs) -> Result<Self> {
        let rest = self.apply_overrides(kwargs)?;
        let method = select::<Self::UpdateMethod>(Self::ENTITY, method.unwrap_or(Self::DEFAULT_UPDATE))?;
        debug!(target: "tbg.api", entity = Self::ENTITY, method = method.name(), "update");
        let updated = self.dispatch_update(method, resolver, HandlerArgs::new(Self::ENTITY, method.name(), rest))?;
        *self = updated.clone();
        Ok(updated)
    }

    /// Pushes this entity to the server using the ambient session.
    fn submit(&mut self, method: Option<&str>, kwargs: Kwargs) -> Result<Self> {
        self.submit_in(registry(), method, kwargs)
    }

    /// [`submit`](Self::submit) with an explicit session resolver.
    fn submit_in(&mut self, resolver: &dyn SessionResolver, method: Option<&str>, kwargs: Kwargs) -> Result<Self> {
        let rest = self.apply_overrides(kwargs)?;
        let method = select::<Self::SubmitMethod>(Self::ENTITY, method.unwrap_or(Self::DEFAULT_SUBMIT))?;
        debug!(target: "tbg.api", entity = Self::ENTITY, method = method.name(), "submit");
        let submitted = self.dispatch_submit(method, resolver, HandlerArgs::new(Self::ENTITY, method.name(), rest))?;
        *self = submitted.clone();
        Ok(submitted)
    }

    /// Writes keyword overrides naming a field into `self`, returning the rest.
    fn apply_overrides(&mut self, kwargs: Kwargs) -> Result<Kwargs> {
        let (fields, rest): (Kwargs, Kwargs) = kwargs
            .into_iter()
            .partition(|(name, _)| Self::FIELDS.contains(&name.as_str()));
        if fields.is_empty() {
            return Ok(rest);
        }

        let mut current = serde_json::to_value(&*self)?;
        if let Value::Object(map) = &mut current {
            map.extend(fields);
        }
        *self = serde_json::from_value(current)?;
        Ok(rest)
    }
}

fn select<M: Method>(entity: &'static str, name: &str) -> Result<M> {
    M::parse(name).ok_or_else(|| Error::UnsupportedMethod {
        entity,
        method: name.to_string(),
    })
}
