//! Service and endpoints models
//!
//! Minimal shapes for the one resource kind the lookup layer ships with
//! (`Service`) and the dependent record used to query it (`Endpoints`).
//! Only the metadata matters to the mirror; the remaining fields are
//! carried through untouched.

use serde::{Deserialize, Serialize};

use crate::key::{Object, ObjectMeta, Resource};

/// A port exposed by a service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePort {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_port: Option<u16>,
    #[serde(default = "default_protocol")]
    pub protocol: String,
}

fn default_protocol() -> String {
    "TCP".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSpec {
    #[serde(rename = "clusterIP", default, skip_serializing_if = "Option::is_none")]
    pub cluster_ip: Option<String>,
    #[serde(default)]
    pub ports: Vec<ServicePort>,
}

/// The cached resource kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: ServiceSpec,
}

impl Service {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            metadata: ObjectMeta::new(namespace, name),
            spec: ServiceSpec::default(),
        }
    }

    pub fn with_cluster_ip(mut self, ip: impl Into<String>) -> Self {
        self.spec.cluster_ip = Some(ip.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.spec.ports.push(ServicePort {
            port,
            protocol: default_protocol(),
            ..Default::default()
        });
        self
    }

    pub fn with_resource_version(mut self, version: impl Into<crate::ResourceVersion>) -> Self {
        self.metadata.resource_version = Some(version.into());
        self
    }
}

impl Object for Service {
    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

impl Resource for Service {
    const KIND: &'static str = "Service";
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointAddress {
    pub ip: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointSubset {
    #[serde(default)]
    pub addresses: Vec<EndpointAddress>,
    #[serde(default)]
    pub ports: Vec<ServicePort>,
}

/// The dependent record presented to a lookup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub subsets: Vec<EndpointSubset>,
}

impl Endpoints {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            metadata: ObjectMeta::new(namespace, name),
            subsets: Vec::new(),
        }
    }

    pub fn with_address(mut self, ip: impl Into<String>, port: u16) -> Self {
        self.subsets.push(EndpointSubset {
            addresses: vec![EndpointAddress { ip: ip.into() }],
            ports: vec![ServicePort {
                port,
                protocol: default_protocol(),
                ..Default::default()
            }],
        });
        self
    }
}

impl Object for Endpoints {
    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_decodes_from_json() {
        let json = r#"{
            "metadata": {"namespace": "default", "name": "svc-a", "resourceVersion": "12"},
            "spec": {"clusterIP": "10.0.0.1", "ports": [{"port": 80}]}
        }"#;
        let svc: Service = serde_json::from_str(json).unwrap();
        assert_eq!(svc.key().unwrap().to_string(), "default/svc-a");
        assert_eq!(svc.resource_version().map(|rv| rv.as_str()), Some("12"));
        assert_eq!(svc.spec.cluster_ip.as_deref(), Some("10.0.0.1"));
        assert_eq!(svc.spec.ports[0].protocol, "TCP");
    }

    #[test]
    fn test_endpoints_share_service_key() {
        let svc = Service::new("default", "svc-a").with_port(80);
        let eps = Endpoints::new("default", "svc-a").with_address("10.1.0.4", 8080);
        assert_eq!(svc.key().unwrap(), eps.key().unwrap());
        assert_eq!(Service::KIND, "Service");
        assert_eq!(Service::GROUP, "");
    }
}
