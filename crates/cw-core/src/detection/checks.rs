//! Built-in per-asset-type compliance checks.
//!
//! These checks compare cached fact snapshots against fixed thresholds and
//! produce violations. They run independently of the declarative rule
//! registry and never fail on missing data: an asset without a cached
//! snapshot simply produces no violations.

use crate::asset::{CertificateInfo, DomainRecord, IpRecord, IpReputation, MonitoredAsset};
use crate::policy::{link_policy, CompliancePolicy};
use crate::violation::{Evidence, RemediationAction, Severity, Violation};

/// Certificate expiry escalation bands, in days.
const CERT_EXPIRY_CRITICAL_DAYS: i64 = 7;
const CERT_EXPIRY_HIGH_DAYS: i64 = 30;
const CERT_EXPIRY_MEDIUM_DAYS: i64 = 60;

/// SPF marker expected in a domain's TXT records.
const SPF_MARKER: &str = "v=spf1";
/// DMARC marker expected in a domain's TXT records.
const DMARC_MARKER: &str = "v=DMARC1";

/// Builds a violation for an asset, attaching the serialized fact snapshot
/// as evidence and the default pending manual remediation action.
fn build_violation(
    asset: &MonitoredAsset,
    severity: Severity,
    title: String,
    description: String,
    snapshot: serde_json::Value,
    remediation: String,
    policies: &[CompliancePolicy],
    policy_keywords: &[&str],
) -> Violation {
    let (policy_id, policy_name) = link_policy(policies, policy_keywords);
    Violation::new(
        asset.id,
        asset.asset_type,
        asset.identifier.clone(),
        severity,
        title,
        description,
    )
    .with_policy(policy_id, policy_name)
    .with_evidence(Evidence::fact_snapshot(
        format!("Cached fact snapshot for {}", asset.identifier),
        snapshot,
    ))
    .with_remediation(RemediationAction::pending_manual(remediation))
}

/// Checks a certificate snapshot for expiry and validity violations.
///
/// Expiry banding: ≤7 days critical, ≤30 high, ≤60 medium, otherwise none.
/// An invalid certificate always raises a separate critical violation,
/// independent of expiry; both may fire for the same asset.
pub fn check_certificate(
    asset: &MonitoredAsset,
    info: &CertificateInfo,
    policies: &[CompliancePolicy],
) -> Vec<Violation> {
    let mut violations = Vec::new();
    let snapshot = serde_json::to_value(info).unwrap_or_default();
    let keywords: &[&str] = &["tls", "encryption", "certificate"];

    let expiry_severity = if info.days_until_expiry <= CERT_EXPIRY_CRITICAL_DAYS {
        Some(Severity::Critical)
    } else if info.days_until_expiry <= CERT_EXPIRY_HIGH_DAYS {
        Some(Severity::High)
    } else if info.days_until_expiry <= CERT_EXPIRY_MEDIUM_DAYS {
        Some(Severity::Medium)
    } else {
        None
    };

    if let Some(severity) = expiry_severity {
        violations.push(build_violation(
            asset,
            severity,
            format!("Certificate expiring: {}", asset.identifier),
            format!(
                "Certificate for {} expires in {} days",
                asset.identifier, info.days_until_expiry
            ),
            snapshot.clone(),
            "Renew the certificate before it expires".to_string(),
            policies,
            keywords,
        ));
    }

    if !info.is_valid {
        violations.push(build_violation(
            asset,
            Severity::Critical,
            format!("Invalid certificate: {}", asset.identifier),
            format!(
                "Certificate for {} failed signature or chain validation",
                asset.identifier
            ),
            snapshot,
            "Replace the certificate with one from a trusted chain".to_string(),
            policies,
            keywords,
        ));
    }

    violations
}

/// Checks a domain's cached TXT records for SPF and DMARC markers.
///
/// Each missing marker raises its own high violation; both may fire.
pub fn check_domain(
    asset: &MonitoredAsset,
    record: &DomainRecord,
    policies: &[CompliancePolicy],
) -> Vec<Violation> {
    let mut violations = Vec::new();
    let snapshot = serde_json::to_value(record).unwrap_or_default();
    let keywords: &[&str] = &["email", "dns"];

    if !record.has_txt_marker(SPF_MARKER) {
        violations.push(build_violation(
            asset,
            Severity::High,
            format!("Missing SPF record: {}", asset.identifier),
            format!("No TXT record containing {} found for {}", SPF_MARKER, asset.identifier),
            snapshot.clone(),
            "Publish an SPF TXT record for the domain".to_string(),
            policies,
            keywords,
        ));
    }

    if !record.has_txt_marker(DMARC_MARKER) {
        violations.push(build_violation(
            asset,
            Severity::High,
            format!("Missing DMARC record: {}", asset.identifier),
            format!(
                "No TXT record containing {} found for {}",
                DMARC_MARKER, asset.identifier
            ),
            snapshot,
            "Publish a DMARC TXT record for the domain".to_string(),
            policies,
            keywords,
        ));
    }

    violations
}

/// Checks an IP reputation snapshot.
///
/// Malicious reputation raises a critical violation; a Tor exit flag raises
/// a high violation independent of reputation.
pub fn check_ip(
    asset: &MonitoredAsset,
    record: &IpRecord,
    policies: &[CompliancePolicy],
) -> Vec<Violation> {
    let mut violations = Vec::new();
    let snapshot = serde_json::to_value(record).unwrap_or_default();
    let keywords: &[&str] = &["network"];

    if record.reputation == IpReputation::Malicious {
        violations.push(build_violation(
            asset,
            Severity::Critical,
            format!("Malicious IP reputation: {}", asset.identifier),
            format!("{} is flagged as malicious by reputation data", asset.identifier),
            snapshot.clone(),
            "Investigate and block traffic to the address".to_string(),
            policies,
            keywords,
        ));
    }

    if record.is_tor {
        violations.push(build_violation(
            asset,
            Severity::High,
            format!("Tor exit node: {}", asset.identifier),
            format!("{} is a known Tor exit node", asset.identifier),
            snapshot,
            "Review whether traffic from this address is expected".to_string(),
            policies,
            keywords,
        ));
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::violation::AssetType;

    fn cert_asset() -> MonitoredAsset {
        MonitoredAsset::new(AssetType::Certificate, "api.example.com")
    }

    #[test]
    fn test_certificate_expiry_bands() {
        let asset = cert_asset();

        let cases = [
            (3, Some(Severity::Critical)),
            (7, Some(Severity::Critical)),
            (8, Some(Severity::High)),
            (30, Some(Severity::High)),
            (31, Some(Severity::Medium)),
            (60, Some(Severity::Medium)),
            (61, None),
            (365, None),
        ];

        for (days, expected) in cases {
            let info = CertificateInfo::new("api.example.com", "Example CA", days);
            let violations = check_certificate(&asset, &info, &[]);
            match expected {
                Some(severity) => {
                    assert_eq!(violations.len(), 1, "days={}", days);
                    assert_eq!(violations[0].severity, severity, "days={}", days);
                }
                None => assert!(violations.is_empty(), "days={}", days),
            }
        }
    }

    #[test]
    fn test_invalid_certificate_always_critical() {
        let asset = cert_asset();
        let info = CertificateInfo::new("api.example.com", "Example CA", 365).with_valid(false);
        let violations = check_certificate(&asset, &info, &[]);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].severity, Severity::Critical);
        assert!(violations[0].title.contains("Invalid certificate"));
    }

    #[test]
    fn test_expiring_and_invalid_both_fire() {
        let asset = cert_asset();
        let info = CertificateInfo::new("api.example.com", "Example CA", 5).with_valid(false);
        let violations = check_certificate(&asset, &info, &[]);
        assert_eq!(violations.len(), 2);
        assert!(violations.iter().all(|v| v.severity == Severity::Critical));
    }

    #[test]
    fn test_certificate_violation_carries_evidence_and_remediation() {
        let asset = cert_asset();
        let info = CertificateInfo::new("api.example.com", "Example CA", 5);
        let violations = check_certificate(&asset, &info, &[]);

        let v = &violations[0];
        assert_eq!(v.evidence.len(), 1);
        assert_eq!(v.evidence[0].evidence_type, "fact_snapshot");
        assert_eq!(
            v.evidence[0].data["days_until_expiry"],
            serde_json::json!(5)
        );
        assert_eq!(v.remediation_actions.len(), 1);
    }

    #[test]
    fn test_certificate_policy_linkage() {
        let asset = cert_asset();
        let policies = vec![CompliancePolicy::new(
            "pol-tls",
            "Certificate hygiene",
            "TLS baseline",
        )];
        let info = CertificateInfo::new("api.example.com", "Example CA", 5);
        let violations = check_certificate(&asset, &info, &policies);
        assert_eq!(violations[0].policy_id, "pol-tls");
    }

    #[test]
    fn test_certificate_sentinel_policy() {
        let asset = cert_asset();
        let info = CertificateInfo::new("api.example.com", "Example CA", 5);
        let violations = check_certificate(&asset, &info, &[]);
        assert_eq!(violations[0].policy_id, "system");
        assert_eq!(violations[0].policy_name, "System");
    }

    fn domain_asset() -> MonitoredAsset {
        MonitoredAsset::new(AssetType::Domain, "example.com")
    }

    fn txt(value: &str) -> crate::asset::DnsRecord {
        crate::asset::DnsRecord {
            record_type: "TXT".to_string(),
            name: "example.com".to_string(),
            value: value.to_string(),
            ttl: 300,
        }
    }

    #[test]
    fn test_domain_missing_both_markers() {
        let asset = domain_asset();
        let record = DomainRecord::new("example.com", vec![]);
        let violations = check_domain(&asset, &record, &[]);
        assert_eq!(violations.len(), 2);
        assert!(violations.iter().all(|v| v.severity == Severity::High));
        assert!(violations.iter().any(|v| v.title.contains("SPF")));
        assert!(violations.iter().any(|v| v.title.contains("DMARC")));
    }

    #[test]
    fn test_domain_missing_only_dmarc() {
        let asset = domain_asset();
        let record = DomainRecord::new("example.com", vec![txt("v=spf1 -all")]);
        let violations = check_domain(&asset, &record, &[]);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].title.contains("DMARC"));
    }

    #[test]
    fn test_domain_fully_configured() {
        let asset = domain_asset();
        let record = DomainRecord::new(
            "example.com",
            vec![txt("v=spf1 -all"), txt("v=DMARC1; p=reject")],
        );
        assert!(check_domain(&asset, &record, &[]).is_empty());
    }

    fn ip_asset() -> MonitoredAsset {
        MonitoredAsset::new(AssetType::Ip, "203.0.113.9")
    }

    #[test]
    fn test_ip_malicious_reputation() {
        let asset = ip_asset();
        let record = IpRecord::new("203.0.113.9", IpReputation::Malicious);
        let violations = check_ip(&asset, &record, &[]);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].severity, Severity::Critical);
    }

    #[test]
    fn test_ip_tor_independent_of_reputation() {
        let asset = ip_asset();
        let record = IpRecord::new("203.0.113.9", IpReputation::Malicious).with_tor(true);
        let violations = check_ip(&asset, &record, &[]);
        assert_eq!(violations.len(), 2);

        let record = IpRecord::new("203.0.113.9", IpReputation::Clean).with_tor(true);
        let violations = check_ip(&asset, &record, &[]);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].severity, Severity::High);
    }

    #[test]
    fn test_ip_clean_no_violations() {
        let asset = ip_asset();
        let record = IpRecord::new("203.0.113.9", IpReputation::Clean);
        assert!(check_ip(&asset, &record, &[]).is_empty());
    }
}
