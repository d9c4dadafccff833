//! Deciding what a report URL may see.
//!
//! The candidate identities are rebuilt from the current rows on every request,
//! so a site or channel that disappears from the sheet stops authorizing
//! immediately.

use serde::Serialize;

use crate::record::{DeliveryRow, extract_channel, zone_has_channel};
use crate::token::TokenValidator;

/// Outcome of checking a request's `site` and `veiculo` tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "access", rename_all = "snake_case")]
pub enum AccessDecision {
    /// The site token is the agency token: every row is visible.
    Agency,
    /// Both tokens resolved: rows of this site carrying this channel.
    Scoped { site: String, channel: String },
    /// Anything else, including a site that resolves without its channel.
    Denied,
}

impl AccessDecision {
    pub fn is_denied(&self) -> bool {
        matches!(self, AccessDecision::Denied)
    }

    pub fn site(&self) -> Option<&str> {
        match self {
            AccessDecision::Scoped { site, .. } => Some(site),
            _ => None,
        }
    }

    /// Whether a row falls inside the authorized scope.
    pub fn permits(&self, row: &DeliveryRow) -> bool {
        match self {
            AccessDecision::Agency => true,
            AccessDecision::Scoped { site, channel } => {
                row.site == *site && zone_has_channel(&row.zone, channel)
            }
            AccessDecision::Denied => false,
        }
    }
}

/// Distinct sites in order of first appearance
///
/// Sites are already trimmed at ingestion.
pub fn possible_sites(rows: &[DeliveryRow]) -> Vec<String> {
    let mut sites: Vec<String> = Vec::new();
    for row in rows {
        if !sites.contains(&row.site) {
            sites.push(row.site.clone());
        }
    }
    sites
}

/// Distinct bracketed channels in order of first appearance
pub fn possible_channels(rows: &[DeliveryRow]) -> Vec<String> {
    let mut channels: Vec<String> = Vec::new();
    let mut seen_zones: Vec<&str> = Vec::new();
    for row in rows {
        if seen_zones.contains(&row.zone.as_str()) {
            continue;
        }
        seen_zones.push(&row.zone);

        if let Some(channel) = extract_channel(&row.zone) {
            if !channels.contains(&channel) {
                channels.push(channel);
            }
        }
    }
    channels
}

/// Resolve a request's tokens against the current rows
///
/// # Arguments
/// * `validator` - Token checks for the configured secret and agency sentinel
/// * `site_token` - Value of the `site` URL parameter, empty if absent
/// * `channel_token` - Value of the `veiculo` URL parameter, empty if absent
/// * `rows` - Current snapshot of delivery rows
///
/// # Returns
/// * `AccessDecision` - Agency when the site token is the agency token,
///   Scoped when both tokens resolve, Denied otherwise
pub fn authorize(
    validator: &TokenValidator<'_>,
    site_token: &str,
    channel_token: &str,
    rows: &[DeliveryRow],
) -> AccessDecision {
    if validator.is_superuser(site_token) {
        log::info!("Agency token presented, granting full report");
        return AccessDecision::Agency;
    }

    let sites = possible_sites(rows);
    let channels = possible_channels(rows);
    let site = validator.validate(site_token, &sites);
    let channel = validator.validate(channel_token, &channels);

    match (site, channel) {
        (Some(site), Some(channel)) => {
            log::info!("Granted report for site '{}' channel '{}'", site, channel);
            AccessDecision::Scoped {
                site: site.to_string(),
                channel: channel.to_string(),
            }
        }
        (site, channel) => {
            log::warn!(
                "Denied report access (site resolved: {}, channel resolved: {}, {} sites, {} channels)",
                site.is_some(),
                channel.is_some(),
                sites.len(),
                channels.len()
            );
            AccessDecision::Denied
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const SECRET: &[u8] = b"s3cr3t";

    fn row(site: &str, zone: &str) -> DeliveryRow {
        DeliveryRow {
            site: site.to_string(),
            zone: zone.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            impressions: 100.0,
            clicks: 1.0,
            conversions: 50.0,
            placement_size: "300x250".to_string(),
        }
    }

    fn rows() -> Vec<DeliveryRow> {
        vec![
            row("123 Portal Norte", "Home [Radio Sul]"),
            row("123 Portal Norte", "Home [TV Leste]"),
            row("456 Portal Sul", "Capa [ Radio Sul ]"),
            row("456 Portal Sul", "Capa sem canal"),
        ]
    }

    #[test]
    fn candidates_are_distinct_and_ordered() {
        let rows = rows();
        assert_eq!(possible_sites(&rows), vec!["123 Portal Norte", "456 Portal Sul"]);
        assert_eq!(possible_channels(&rows), vec!["Radio Sul", "TV Leste"]);
    }

    #[test]
    fn agency_token_sees_everything() {
        let validator = TokenValidator::new(SECRET, "AGENCIA");
        let decision = authorize(&validator, &validator.agency_token(), "", &rows());
        assert_eq!(decision, AccessDecision::Agency);
        assert!(rows().iter().all(|r| decision.permits(r)));
    }

    #[test]
    fn agency_needs_no_rows() {
        let validator = TokenValidator::new(SECRET, "AGENCIA");
        assert_eq!(
            authorize(&validator, &validator.agency_token(), "", &[]),
            AccessDecision::Agency
        );
    }

    #[test]
    fn agency_wins_when_sentinel_is_also_a_site() {
        let validator = TokenValidator::new(SECRET, "AGENCIA");
        let mut rows = rows();
        rows.push(row("AGENCIA", "Home [Radio Sul]"));
        assert!(possible_sites(&rows).contains(&"AGENCIA".to_string()));

        let agency = validator.agency_token();
        assert_eq!(authorize(&validator, &agency, "", &rows), AccessDecision::Agency);
        assert_eq!(
            authorize(&validator, &agency, &validator.compute("Radio Sul"), &rows),
            AccessDecision::Agency
        );
    }

    #[test]
    fn both_tokens_scope_the_report() {
        let validator = TokenValidator::new(SECRET, "AGENCIA");
        let decision = authorize(
            &validator,
            &validator.compute("123 Portal Norte"),
            &validator.compute("Radio Sul"),
            &rows(),
        );
        assert_eq!(
            decision,
            AccessDecision::Scoped {
                site: "123 Portal Norte".to_string(),
                channel: "Radio Sul".to_string()
            }
        );
        assert_eq!(decision.site(), Some("123 Portal Norte"));

        let visible: Vec<_> = rows().into_iter().filter(|r| decision.permits(r)).collect();
        assert_eq!(visible, vec![row("123 Portal Norte", "Home [Radio Sul]")]);
    }

    #[test]
    fn partial_authorization_is_denied() {
        let validator = TokenValidator::new(SECRET, "AGENCIA");
        let site_only = authorize(&validator, &validator.compute("123 Portal Norte"), "", &rows());
        let channel_only = authorize(&validator, "", &validator.compute("TV Leste"), &rows());
        assert!(site_only.is_denied());
        assert!(channel_only.is_denied());
        assert!(!site_only.permits(&rows()[0]));
    }

    #[test]
    fn tokens_for_identities_not_in_data_are_denied() {
        let validator = TokenValidator::new(SECRET, "AGENCIA");
        let decision = authorize(
            &validator,
            &validator.compute("999 Unknown"),
            &validator.compute("Radio Sul"),
            &rows(),
        );
        assert!(decision.is_denied());
    }

    #[test]
    fn channel_token_for_a_site_token_slot_is_denied() {
        let validator = TokenValidator::new(SECRET, "AGENCIA");
        let decision = authorize(
            &validator,
            &validator.compute("Radio Sul"),
            &validator.compute("123 Portal Norte"),
            &rows(),
        );
        assert!(decision.is_denied());
    }
}
