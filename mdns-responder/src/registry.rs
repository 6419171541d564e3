//! Service registry.
//!
//! Renders high-level host, service and service-instance descriptions into
//! the [`Database`] the query processor answers from. A database is rendered
//! per interface (the host's address records differ between links) and
//! re-rendered whenever a service instance is registered.
//!
//! The DNS-SD name tree produced here:
//!
//! - `<host>.<domain>`: A/AAAA records plus NSEC.
//! - `<service>.<domain>`: one PTR per service instance.
//! - `<instance>.<service>.<domain>`: SRV, TXT and NSEC.
//! - `_services._dns-sd._udp.<domain>`: one PTR per service, for service
//!   enumeration.

use std::collections::BTreeMap;
use std::net::IpAddr;

use shared::error::{Error, Result};

use crate::config::{HOST_RECORD_TTL, SERVICE_RECORD_TTL};
use crate::db::{Database, Domain, Record, RecordData};
use crate::message::name::Name;

/// The published host: a name and the addresses it resolves to on one link.
#[derive(Clone, Debug)]
pub struct Host {
    host_name: String,
    domain_name: String,
    addresses: Vec<IpAddr>,
}

impl Host {
    pub fn new(
        host_name: impl Into<String>,
        domain_name: impl Into<String>,
        addresses: Vec<IpAddr>,
    ) -> Result<Self> {
        let host_name = host_name.into();
        if host_name.is_empty() {
            return Err(Error::ErrHostnameEmpty);
        }
        Ok(Host {
            host_name,
            domain_name: domain_name.into(),
            addresses,
        })
    }

    /// The `<host>.<domain>` domain with one address record per configured
    /// address and an NSEC closing the type list.
    pub fn domain(&self) -> Result<Domain> {
        let name = Name::from_dotted(&format!("{}.{}", self.host_name, self.domain_name))?;

        let mut records = Vec::new();
        for address in &self.addresses {
            let data = match address {
                IpAddr::V4(addr) => RecordData::A(addr.octets()),
                IpAddr::V6(addr) => RecordData::Aaaa(addr.octets()),
            };
            records.push(Record {
                ttl: HOST_RECORD_TTL,
                cache_flush: true,
                data,
            });
        }
        records.push(Record {
            ttl: SERVICE_RECORD_TTL,
            cache_flush: true,
            data: RecordData::Nsec,
        });

        Ok(Domain::new(name, records))
    }
}

/// One registered service instance.
#[derive(Clone, Debug)]
pub struct ServiceInstance {
    host_name: String,
    instance_name: String,
    service_name: String,
    domain_name: String,
    port: u16,
    txt_record: Vec<u8>,
}

// A TXT payload is a chain of length-prefixed strings; it is emitted through
// the same walk as a name, so length bytes in the pointer range cannot be
// represented.
fn validate_txt_record(txt_record: &[u8]) -> Result<()> {
    let mut i = 0;
    while i < txt_record.len() {
        let count = txt_record[i] as usize;
        if count >= 0xc0 {
            return Err(Error::ErrInvalidTxtRecord);
        }
        i += 1 + count;
    }
    if i != txt_record.len() {
        return Err(Error::ErrInvalidTxtRecord);
    }
    Ok(())
}

impl ServiceInstance {
    pub fn new(
        host_name: impl Into<String>,
        instance_name: impl Into<String>,
        service_name: impl Into<String>,
        domain_name: impl Into<String>,
        port: u16,
        txt_record: &[u8],
    ) -> Result<Self> {
        validate_txt_record(txt_record)?;
        Ok(ServiceInstance {
            host_name: host_name.into(),
            instance_name: instance_name.into(),
            service_name: service_name.into(),
            domain_name: domain_name.into(),
            port,
            txt_record: txt_record.to_vec(),
        })
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// The `<instance>.<service>.<domain>` domain: SRV to the host, the TXT
    /// payload, and an NSEC closing the type list.
    fn domain(&self) -> Result<Domain> {
        let host_name = Name::from_dotted(&format!("{}.{}", self.host_name, self.domain_name))?;
        let name = Name::from_dotted(&format!(
            "{}.{}.{}",
            self.instance_name, self.service_name, self.domain_name
        ))?;

        // stored terminator included, mirroring the emission walk
        let mut txt = self.txt_record.clone();
        txt.push(0);

        Ok(Domain::new(
            name,
            vec![
                Record {
                    ttl: HOST_RECORD_TTL,
                    cache_flush: true,
                    data: RecordData::Srv {
                        port: self.port,
                        target: host_name,
                    },
                },
                // a TXT record is advertised even when empty
                Record {
                    ttl: SERVICE_RECORD_TTL,
                    cache_flush: true,
                    data: RecordData::Txt(txt),
                },
                Record {
                    ttl: SERVICE_RECORD_TTL,
                    cache_flush: true,
                    data: RecordData::Nsec,
                },
            ],
        ))
    }
}

/// All registered service instances of one responder.
#[derive(Clone, Debug, Default)]
pub struct ServiceCollection {
    domain_name: String,
    instances: Vec<ServiceInstance>,
}

impl ServiceCollection {
    pub fn new(domain_name: impl Into<String>, instances: Vec<ServiceInstance>) -> Self {
        ServiceCollection {
            domain_name: domain_name.into(),
            instances,
        }
    }

    /// Renders the service side of the name tree: per-instance domains,
    /// per-service PTR domains, and the service enumeration domain.
    pub fn domains(&self) -> Result<Vec<Domain>> {
        // group instances by service
        let mut service_map: BTreeMap<&str, Vec<&ServiceInstance>> = BTreeMap::new();
        for instance in &self.instances {
            service_map
                .entry(instance.service_name())
                .or_default()
                .push(instance);
        }

        let mut domains = Vec::new();
        let mut enum_records = Vec::new();

        for (service_name, instances) in &service_map {
            let service_dns_name =
                Name::from_dotted(&format!("{}.{}", service_name, self.domain_name))?;

            let mut ptr_records = Vec::new();
            for instance in instances {
                let instance_domain = instance.domain()?;
                ptr_records.push(Record {
                    ttl: SERVICE_RECORD_TTL,
                    cache_flush: false,
                    data: RecordData::Ptr(instance_domain.name.clone()),
                });
                domains.push(instance_domain);
            }
            enum_records.push(Record {
                ttl: SERVICE_RECORD_TTL,
                cache_flush: false,
                data: RecordData::Ptr(service_dns_name.clone()),
            });
            domains.push(Domain::new(service_dns_name, ptr_records));
        }

        let enum_name =
            Name::from_dotted(&format!("_services._dns-sd._udp.{}", self.domain_name))?;
        domains.push(Domain::new(enum_name, enum_records));

        Ok(domains)
    }
}

/// Composes the per-interface database: the host domain followed by the
/// service domains.
pub fn interface_database(host: &Host, services: &ServiceCollection) -> Result<Database> {
    let mut domains = vec![host.domain()?];
    domains.extend(services.domains()?);
    Ok(Database::new(domains))
}
