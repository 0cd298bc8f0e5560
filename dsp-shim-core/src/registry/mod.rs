//! Symbolic component factory.
//!
//! Maps string identifiers such as `"audio-decoder/aac"` to a
//! `(type, factory, dispatch)` triple and builds live components on demand.
//!
//! ## Matching
//!
//! Lookup is a bounded prefix compare with C `strncmp` semantics: at most
//! `id_length` bytes are compared, and comparison stops early when both
//! sides reach their end. A length one past the identifier therefore
//! behaves like a full-string match, while a shorter length can match
//! several entries. Ambiguous prefixes resolve to the earliest entry in
//! table order, so table order is part of the contract.

pub mod builtin;

use std::borrow::Cow;
use std::fmt;

use tracing::{debug, warn};

use crate::component::{ComponentHandle, ComponentType, CoreConnector, DispatchFn, FactoryFn};
use crate::error::{DspError, Result};

pub use builtin::BUILTIN_COMPONENTS;

/// One row of the component table.
#[derive(Clone, Copy)]
pub struct ComponentDescriptor {
    pub identifier: &'static str,
    pub kind: ComponentType,
    pub factory: FactoryFn,
    pub dispatch: DispatchFn,
}

impl ComponentDescriptor {
    pub const fn new(
        identifier: &'static str,
        kind: ComponentType,
        factory: FactoryFn,
        dispatch: DispatchFn,
    ) -> Self {
        Self {
            identifier,
            kind,
            factory,
            dispatch,
        }
    }

    /// Invoke this entry's factory.
    ///
    /// # Errors
    /// `ComponentConstructionFailed` when the factory (or the core behind it)
    /// refuses to build the component.
    pub fn instantiate(&self, connector: &dyn CoreConnector) -> Result<ComponentHandle> {
        (self.factory)(connector, self.dispatch, self.kind).map_err(|source| {
            warn!(id = self.identifier, "component construction failed: {source}");
            DspError::ComponentConstructionFailed {
                id: self.identifier.to_string(),
                source,
            }
        })
    }

    /// `strncmp(id, self.identifier, len) == 0`.
    fn matches(&self, id: &[u8], len: usize) -> bool {
        let ident = self.identifier.as_bytes();
        for i in 0..len {
            let a = id.get(i).copied().unwrap_or(0);
            let b = ident.get(i).copied().unwrap_or(0);
            if a != b {
                return false;
            }
            if a == 0 {
                break;
            }
        }
        true
    }
}

impl fmt::Debug for ComponentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDescriptor")
            .field("identifier", &self.identifier)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Immutable, ordered component table.
#[derive(Debug, Clone)]
pub struct ComponentRegistry {
    entries: Cow<'static, [ComponentDescriptor]>,
}

impl ComponentRegistry {
    /// Registry over a caller-supplied table. Identifiers should be unique.
    pub fn new(entries: Vec<ComponentDescriptor>) -> Self {
        Self {
            entries: Cow::Owned(entries),
        }
    }

    /// Registry over the built-in codec and renderer table.
    pub fn builtin() -> Self {
        Self {
            entries: Cow::Borrowed(&BUILTIN_COMPONENTS),
        }
    }

    pub fn entries(&self) -> &[ComponentDescriptor] {
        &self.entries
    }

    /// First entry whose identifier matches the first `id_length` bytes of `id`.
    pub fn lookup(&self, id: &str, id_length: usize) -> Option<&ComponentDescriptor> {
        let bytes = id.as_bytes();
        let mut candidates = self.entries.iter().filter(|d| d.matches(bytes, id_length));
        let first = candidates.next()?;

        let shadowed = candidates.count();
        if shadowed > 0 {
            debug!(
                id,
                id_length,
                chosen = first.identifier,
                shadowed,
                "ambiguous component prefix, using first table entry"
            );
        }
        Some(first)
    }

    /// Resolve `id` and construct the component through its factory.
    ///
    /// # Errors
    /// - `UnknownComponent` if no entry matches.
    /// - `ComponentConstructionFailed` if the matching factory fails.
    pub fn resolve(
        &self,
        connector: &dyn CoreConnector,
        id: &str,
        id_length: usize,
    ) -> Result<ComponentHandle> {
        self.resolve_descriptor(connector, id, id_length)
            .map(|(_, handle)| handle)
    }

    /// Like `resolve`, also returning the matched descriptor so the caller can
    /// rebuild the same component later.
    pub fn resolve_descriptor(
        &self,
        connector: &dyn CoreConnector,
        id: &str,
        id_length: usize,
    ) -> Result<(ComponentDescriptor, ComponentHandle)> {
        let Some(descriptor) = self.lookup(id, id_length) else {
            warn!(id, id_length, "unknown component type");
            return Err(DspError::UnknownComponent { id: id.to_string() });
        };
        let handle = descriptor.instantiate(connector)?;
        Ok((*descriptor, handle))
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{dispatch, ComponentClass, LoopbackConnector};

    fn registry() -> ComponentRegistry {
        ComponentRegistry::builtin()
    }

    #[test]
    fn full_length_with_terminator_is_exact() {
        let reg = registry();
        let d = reg.lookup("audio-decoder/aac", 18).unwrap();
        assert_eq!(d.kind, ComponentType::AacDec);

        let reg = registry();
        let d = reg.lookup("audio-decoder/aacext", 21).unwrap();
        assert_eq!(d.kind, ComponentType::AacExtDec);
    }

    #[test]
    fn shared_prefix_resolves_to_earliest_entry() {
        // "audio-decoder/aac" is declared before "audio-decoder/aacext".
        let reg = registry();
        for _ in 0..3 {
            let d = reg.lookup("audio-decoder/aacext", 17).unwrap();
            assert_eq!(d.identifier, "audio-decoder/aac");
        }
    }

    #[test]
    fn shared_prefix_builds_the_earliest_component() {
        let connector = LoopbackConnector::new(16);
        let handle = registry().resolve(&connector, "audio-decoder/aacext", 17).unwrap();
        assert_eq!(handle.kind(), ComponentType::AacDec);
        assert_eq!(connector.log().opened, 1);
    }

    #[test]
    fn zero_length_matches_first_entry() {
        let reg = registry();
        let d = reg.lookup("anything", 0).unwrap();
        assert_eq!(d.identifier, BUILTIN_COMPONENTS[0].identifier);
    }

    #[test]
    fn unknown_id_has_no_match() {
        assert!(registry().lookup("audio-decoder/flac", 19).is_none());
        assert!(registry().lookup("renderer/hdmi", 14).is_none());
    }

    #[test]
    fn length_past_both_ends_still_matches() {
        let reg = registry();
        let d = reg.lookup("renderer/sai", 64).unwrap();
        assert_eq!(d.kind, ComponentType::SaiRenderer);
    }

    #[test]
    fn resolve_wires_factory_and_type() {
        let connector = LoopbackConnector::new(16);
        let handle = registry().resolve(&connector, "renderer/esai", 14).unwrap();
        assert_eq!(handle.kind(), ComponentType::EsaiRenderer);
        assert_eq!(handle.class(), ComponentClass::Renderer);
        assert_eq!(connector.log().inits, 1);
    }

    #[test]
    fn resolve_unknown_reports_id() {
        let connector = LoopbackConnector::new(16);
        let err = registry().resolve(&connector, "audio-decoder/flac", 19).unwrap_err();
        match err {
            DspError::UnknownComponent { id } => assert_eq!(id, "audio-decoder/flac"),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(connector.log().opened, 0);
    }

    #[test]
    fn factory_failure_propagates() {
        let connector = LoopbackConnector::new(16).with_link_limit(0);
        let err = registry().resolve(&connector, "audio-decoder/mp3", 18).unwrap_err();
        assert!(matches!(err, DspError::ComponentConstructionFailed { .. }));
    }

    #[test]
    fn custom_table_keeps_declaration_order() {
        let reg = ComponentRegistry::new(vec![
            ComponentDescriptor::new(
                "renderer/sai-hifi",
                ComponentType::SaiRenderer,
                crate::component::renderer_factory,
                dispatch::renderer,
            ),
            ComponentDescriptor::new(
                "renderer/sai",
                ComponentType::EsaiRenderer,
                crate::component::renderer_factory,
                dispatch::renderer,
            ),
        ]);
        assert_eq!(
            reg.lookup("renderer/sai", 12).unwrap().identifier,
            "renderer/sai-hifi"
        );
        assert_eq!(
            reg.lookup("renderer/sai", 13).unwrap().identifier,
            "renderer/sai"
        );
    }
}
