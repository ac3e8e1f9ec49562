//! Monitored asset and cached fact models.
//!
//! The engine never acquires infrastructure facts itself. An external
//! collector caches per-asset snapshots here; detection reads whatever is
//! cached and silently skips assets with no snapshot.

use crate::violation::AssetType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// An infrastructure asset under compliance monitoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoredAsset {
    /// Unique identifier.
    pub id: Uuid,
    /// Family of the asset.
    pub asset_type: AssetType,
    /// The identifier facts are keyed by (domain name, IP address, cert subject).
    pub identifier: String,
    /// Optional display name.
    pub name: Option<String>,
    /// When the asset was registered.
    pub created_at: DateTime<Utc>,
}

impl MonitoredAsset {
    /// Registers a new asset.
    pub fn new(asset_type: AssetType, identifier: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            asset_type,
            identifier: identifier.into(),
            name: None,
            created_at: Utc::now(),
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// A single DNS record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsRecord {
    /// Record type (A, TXT, MX, ...).
    pub record_type: String,
    /// Record name.
    pub name: String,
    /// Record value.
    pub value: String,
    /// Time-to-live in seconds.
    pub ttl: u32,
}

/// Cached DNS snapshot for a domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainRecord {
    /// The domain the snapshot belongs to.
    pub domain: String,
    /// All records gathered for the domain.
    pub records: Vec<DnsRecord>,
    /// When the snapshot was taken.
    pub cached_at: DateTime<Utc>,
}

impl DomainRecord {
    /// Creates a snapshot from a record list.
    pub fn new(domain: impl Into<String>, records: Vec<DnsRecord>) -> Self {
        Self {
            domain: domain.into(),
            records,
            cached_at: Utc::now(),
        }
    }

    /// Returns true if any TXT record value contains the given marker.
    pub fn has_txt_marker(&self, marker: &str) -> bool {
        self.records
            .iter()
            .filter(|r| r.record_type.eq_ignore_ascii_case("TXT"))
            .any(|r| r.value.contains(marker))
    }
}

/// Reputation classification for an IP address.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IpReputation {
    /// No adverse reports.
    Clean,
    /// Some adverse reports.
    Suspicious,
    /// Confirmed malicious.
    Malicious,
    /// No reputation data available.
    Unknown,
}

/// Cached reputation snapshot for an IP address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpRecord {
    /// The address the snapshot belongs to.
    pub address: String,
    /// Reputation classification.
    pub reputation: IpReputation,
    /// Whether the address is a known Tor exit node.
    pub is_tor: bool,
    /// Whether the address is in private space.
    pub is_private: bool,
    /// When the snapshot was taken.
    pub cached_at: DateTime<Utc>,
}

impl IpRecord {
    /// Creates a snapshot with the given reputation.
    pub fn new(address: impl Into<String>, reputation: IpReputation) -> Self {
        Self {
            address: address.into(),
            reputation,
            is_tor: false,
            is_private: false,
            cached_at: Utc::now(),
        }
    }

    /// Marks the address as a Tor exit node.
    pub fn with_tor(mut self, is_tor: bool) -> Self {
        self.is_tor = is_tor;
        self
    }

    /// Marks the address as private space.
    pub fn with_private(mut self, is_private: bool) -> Self {
        self.is_private = is_private;
        self
    }
}

/// Cached inspection snapshot for a TLS certificate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateInfo {
    /// Certificate subject.
    pub subject: String,
    /// Certificate issuer.
    pub issuer: String,
    /// Days until the certificate expires (negative if already expired).
    pub days_until_expiry: i64,
    /// Whether the signature and chain validated.
    pub is_valid: bool,
    /// When the snapshot was taken.
    pub cached_at: DateTime<Utc>,
}

impl CertificateInfo {
    /// Creates a snapshot for a valid certificate.
    pub fn new(subject: impl Into<String>, issuer: impl Into<String>, days_until_expiry: i64) -> Self {
        Self {
            subject: subject.into(),
            issuer: issuer.into(),
            days_until_expiry,
            is_valid: true,
            cached_at: Utc::now(),
        }
    }

    /// Sets chain/signature validity.
    pub fn with_valid(mut self, is_valid: bool) -> Self {
        self.is_valid = is_valid;
        self
    }
}

/// Per-asset-type fact snapshots keyed by asset identifier.
#[derive(Debug, Default, Clone)]
pub struct FactCache {
    domains: HashMap<String, DomainRecord>,
    ips: HashMap<String, IpRecord>,
    certificates: HashMap<String, CertificateInfo>,
}

impl FactCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Caches a domain snapshot under its identifier.
    pub fn put_domain(&mut self, identifier: impl Into<String>, record: DomainRecord) {
        self.domains.insert(identifier.into(), record);
    }

    /// Caches an IP snapshot under its identifier.
    pub fn put_ip(&mut self, identifier: impl Into<String>, record: IpRecord) {
        self.ips.insert(identifier.into(), record);
    }

    /// Caches a certificate snapshot under its identifier.
    pub fn put_certificate(&mut self, identifier: impl Into<String>, info: CertificateInfo) {
        self.certificates.insert(identifier.into(), info);
    }

    /// Looks up a cached domain snapshot.
    pub fn domain(&self, identifier: &str) -> Option<&DomainRecord> {
        self.domains.get(identifier)
    }

    /// Looks up a cached IP snapshot.
    pub fn ip(&self, identifier: &str) -> Option<&IpRecord> {
        self.ips.get(identifier)
    }

    /// Looks up a cached certificate snapshot.
    pub fn certificate(&self, identifier: &str) -> Option<&CertificateInfo> {
        self.certificates.get(identifier)
    }

    /// Serializes the cached snapshot for an asset, if one exists.
    ///
    /// Used as the generic fact object for rule-driven detection.
    pub fn snapshot_for(&self, asset: &MonitoredAsset) -> Option<serde_json::Value> {
        match asset.asset_type {
            AssetType::Domain => self
                .domain(&asset.identifier)
                .and_then(|r| serde_json::to_value(r).ok()),
            AssetType::Ip => self
                .ip(&asset.identifier)
                .and_then(|r| serde_json::to_value(r).ok()),
            AssetType::Certificate => self
                .certificate(&asset.identifier)
                .and_then(|r| serde_json::to_value(r).ok()),
            AssetType::CloudResource => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn txt(value: &str) -> DnsRecord {
        DnsRecord {
            record_type: "TXT".to_string(),
            name: "example.com".to_string(),
            value: value.to_string(),
            ttl: 300,
        }
    }

    #[test]
    fn test_txt_marker_lookup() {
        let record = DomainRecord::new(
            "example.com",
            vec![
                txt("v=spf1 include:_spf.example.com ~all"),
                DnsRecord {
                    record_type: "A".to_string(),
                    name: "example.com".to_string(),
                    value: "93.184.216.34".to_string(),
                    ttl: 300,
                },
            ],
        );

        assert!(record.has_txt_marker("v=spf1"));
        assert!(!record.has_txt_marker("v=DMARC1"));
    }

    #[test]
    fn test_txt_marker_ignores_non_txt_records() {
        let record = DomainRecord::new(
            "example.com",
            vec![DnsRecord {
                record_type: "A".to_string(),
                name: "example.com".to_string(),
                value: "v=spf1 -all".to_string(),
                ttl: 300,
            }],
        );
        assert!(!record.has_txt_marker("v=spf1"));
    }

    #[test]
    fn test_fact_cache_lookup_and_miss() {
        let mut cache = FactCache::new();
        cache.put_ip("10.0.0.1", IpRecord::new("10.0.0.1", IpReputation::Clean));

        assert!(cache.ip("10.0.0.1").is_some());
        assert!(cache.ip("10.0.0.2").is_none());
        assert!(cache.domain("example.com").is_none());
    }

    #[test]
    fn test_snapshot_for_serializes_cached_fact() {
        let mut cache = FactCache::new();
        cache.put_certificate(
            "api.example.com",
            CertificateInfo::new("api.example.com", "Example CA", 14),
        );

        let asset = MonitoredAsset::new(AssetType::Certificate, "api.example.com");
        let snapshot = cache.snapshot_for(&asset).unwrap();
        assert_eq!(snapshot["days_until_expiry"], serde_json::json!(14));
        assert_eq!(snapshot["is_valid"], serde_json::json!(true));
    }

    #[test]
    fn test_snapshot_for_missing_fact() {
        let cache = FactCache::new();
        let asset = MonitoredAsset::new(AssetType::Domain, "example.com");
        assert!(cache.snapshot_for(&asset).is_none());
    }
}
