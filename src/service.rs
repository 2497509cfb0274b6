//! Service definitions
//!
//! The main entry point is [ServiceBuilder]. Rpcs are registered one by one,
//! each registration validating its type arguments immediately. The finished
//! [ServiceDef] is immutable and can be extended by defining a sub service
//! with [ServiceDef::subclass], which sees all rpcs of its ancestors.
use std::{collections::BTreeMap, fmt, sync::Arc};

use crate::{
    config::MarshalNames,
    desc::{RpcArgs, RpcDesc},
    error::{IncompleteService, ServiceError},
    handler::Handlers,
    stub::StubClass,
};

/// Builder for a [ServiceDef]
#[derive(Debug)]
pub struct ServiceBuilder {
    name: String,
    parent: Option<ServiceDef>,
    names: Option<MarshalNames>,
    own: BTreeMap<String, Arc<RpcDesc>>,
}

impl ServiceBuilder {
    /// Start a new service without any rpcs. This never fails.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            names: None,
            own: BTreeMap::new(),
        }
    }

    /// Register an rpc.
    ///
    /// `args` must be exactly a request and a response type, see [RpcArgs].
    /// Both are validated against the capability names in force at the time of
    /// this call. On error the builder is left unchanged.
    pub fn rpc(
        &mut self,
        name: impl Into<String>,
        args: impl RpcArgs,
    ) -> Result<&mut Self, ServiceError> {
        let name = name.into();
        if self.own.contains_key(&name) {
            return Err(ServiceError::DuplicateRpc { rpc: name });
        }
        let desc = RpcDesc::new(name, args, &self.marshal_names())?;
        if let Some(existing) = self.method_owner(desc.name(), desc.method_name()) {
            return Err(ServiceError::MethodNameCollision {
                rpc: desc.name().to_string(),
                existing: existing.to_string(),
                method: desc.method_name().to_string(),
            });
        }
        tracing::debug!(
            service = %self.name,
            rpc = desc.name(),
            method = desc.method_name(),
            kind = %desc.kind(),
            "registered rpc"
        );
        self.own.insert(desc.name().to_string(), Arc::new(desc));
        Ok(self)
    }

    /// Another rpc, own or inherited, with the method name `method`.
    ///
    /// An inherited rpc of the same name is not a collision, it is shadowed.
    fn method_owner(&self, rpc: &str, method: &str) -> Option<&str> {
        let inherited = self
            .parent
            .iter()
            .flat_map(|parent| parent.rpc_descs().values());
        self.own
            .values()
            .chain(inherited)
            .find(|desc| desc.method_name() == method && desc.name() != rpc)
            .map(|desc| desc.name())
    }

    /// Set the name of the marshal capability used by later registrations
    pub fn set_marshal_instance_method(&mut self, name: impl Into<String>) -> &mut Self {
        let mut names = self.marshal_names();
        names.marshal_instance_method = name.into();
        self.names = Some(names);
        self
    }

    /// Set the name of the unmarshal capability used by later registrations
    pub fn set_unmarshal_class_method(&mut self, name: impl Into<String>) -> &mut Self {
        let mut names = self.marshal_names();
        names.unmarshal_class_method = name.into();
        self.names = Some(names);
        self
    }

    /// Set both capability names
    pub fn set_marshal_names(&mut self, names: MarshalNames) -> &mut Self {
        self.names = Some(names);
        self
    }

    /// Name of the marshal capability, own or inherited
    pub fn marshal_instance_method(&self) -> String {
        self.marshal_names().marshal_instance_method
    }

    /// Name of the unmarshal capability, own or inherited
    pub fn unmarshal_class_method(&self) -> String {
        self.marshal_names().unmarshal_class_method
    }

    /// The capability names in force, own or inherited
    pub fn marshal_names(&self) -> MarshalNames {
        match (&self.names, &self.parent) {
            (Some(names), _) => names.clone(),
            (None, Some(parent)) => parent.marshal_names().clone(),
            (None, None) => MarshalNames::default(),
        }
    }

    /// Finish the service.
    ///
    /// Rpcs of the parent are merged into the definition; rpcs registered on
    /// this builder shadow inherited ones of the same name.
    pub fn build(self) -> ServiceDef {
        let names = self.marshal_names();
        let mut descs = self
            .parent
            .as_ref()
            .map(|parent| parent.0.descs.clone())
            .unwrap_or_default();
        descs.extend(self.own);
        ServiceDef(Arc::new(Inner {
            name: self.name,
            parent: self.parent,
            names,
            descs,
        }))
    }
}

struct Inner {
    name: String,
    parent: Option<ServiceDef>,
    names: MarshalNames,
    descs: BTreeMap<String, Arc<RpcDesc>>,
}

/// A finished service definition.
///
/// This is cheap to clone. All rpcs of all ancestors are visible in
/// [ServiceDef::rpc_descs].
#[derive(Clone)]
pub struct ServiceDef(Arc<Inner>);

impl ServiceDef {
    /// Start a sub service that inherits the rpcs and capability names of this one
    pub fn subclass(&self, name: impl Into<String>) -> ServiceBuilder {
        ServiceBuilder {
            parent: Some(self.clone()),
            ..ServiceBuilder::new(name)
        }
    }

    /// Name of the service
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// The direct parent, if any
    pub fn parent(&self) -> Option<&ServiceDef> {
        self.0.parent.as_ref()
    }

    /// True if `other` is this service or one of its ancestors
    pub fn descends_from(&self, other: &ServiceDef) -> bool {
        let mut current = Some(self);
        while let Some(def) = current {
            if Arc::ptr_eq(&def.0, &other.0) {
                return true;
            }
            current = def.parent();
        }
        false
    }

    /// Capability names of the service
    pub fn marshal_names(&self) -> &MarshalNames {
        &self.0.names
    }

    /// Name of the marshal capability
    pub fn marshal_instance_method(&self) -> &str {
        &self.0.names.marshal_instance_method
    }

    /// Name of the unmarshal capability
    pub fn unmarshal_class_method(&self) -> &str {
        &self.0.names.unmarshal_class_method
    }

    /// All rpcs, own and inherited, by rpc name
    pub fn rpc_descs(&self) -> &BTreeMap<String, Arc<RpcDesc>> {
        &self.0.descs
    }

    /// Look up an rpc by name
    pub fn rpc_desc(&self, name: &str) -> Option<&Arc<RpcDesc>> {
        self.0.descs.get(name)
    }

    /// Look up an rpc by the name of its method
    pub fn rpc_desc_by_method(&self, method: &str) -> Option<&Arc<RpcDesc>> {
        self.0.descs.values().find(|desc| desc.method_name() == method)
    }

    /// Generate a client stub class with one call method per rpc
    pub fn rpc_stub_class(&self) -> StubClass {
        StubClass::new(self)
    }

    /// Check that `handlers` defines a method for every rpc of this service.
    ///
    /// Methods inherited by `handlers` count. A method whose shape does not
    /// match the interaction pattern of its rpc is logged but accepted.
    pub fn assert_rpc_descs_have_methods(
        &self,
        handlers: &Handlers,
    ) -> Result<(), IncompleteService> {
        let mut missing = Vec::new();
        for desc in self.0.descs.values() {
            match handlers.kind_of(desc.method_name()) {
                Some(kind) if kind != desc.kind() => {
                    tracing::warn!(
                        service = %self.0.name,
                        method = desc.method_name(),
                        expected = %desc.kind(),
                        actual = %kind,
                        "method shape does not match rpc"
                    );
                }
                Some(_) => {}
                None => missing.push(desc.name().to_string()),
            }
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(IncompleteService {
                service: self.0.name.clone(),
                missing,
            })
        }
    }
}

impl fmt::Debug for ServiceDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDef")
            .field("name", &self.0.name)
            .field("parent", &self.parent().map(|p| p.name()))
            .field("rpcs", &self.0.descs.keys().collect::<Vec<_>>())
            .finish()
    }
}
