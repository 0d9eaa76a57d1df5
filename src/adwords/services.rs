//! Services available in each supported AdWords API version.

/// The canonical AdWords endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://adwords.google.com";

/// Versions known to this library, oldest first.
pub const SUPPORTED_VERSIONS: &[&str] = &["v201402"];

/// The version used when none is requested.
pub const LATEST_VERSION: &str = "v201402";

const V201402: &[(&str, &str)] = &[
    ("AdGroupAdService", "cm"),
    ("AdGroupBidModifierService", "cm"),
    ("AdGroupCriterionService", "cm"),
    ("AdGroupFeedService", "cm"),
    ("AdGroupService", "cm"),
    ("AdParamService", "cm"),
    ("AdwordsUserListService", "rm"),
    ("AlertService", "mcm"),
    ("BiddingStrategyService", "cm"),
    ("BudgetOrderService", "billing"),
    ("BudgetService", "cm"),
    ("CampaignAdExtensionService", "cm"),
    ("CampaignCriterionService", "cm"),
    ("CampaignFeedService", "cm"),
    ("CampaignService", "cm"),
    ("ConstantDataService", "cm"),
    ("ConversionTrackerService", "cm"),
    ("CustomerFeedService", "cm"),
    ("CustomerService", "mcm"),
    ("CustomerSyncService", "ch"),
    ("DataService", "cm"),
    ("ExperimentService", "cm"),
    ("FeedItemService", "cm"),
    ("FeedMappingService", "cm"),
    ("FeedService", "cm"),
    ("GeoLocationService", "cm"),
    ("LocationCriterionService", "cm"),
    ("ManagedCustomerService", "mcm"),
    ("MediaService", "cm"),
    ("MutateJobService", "cm"),
    ("OfflineConversionFeedService", "cm"),
    ("ReportDefinitionService", "cm"),
    ("TargetingIdeaService", "o"),
    ("TrafficEstimatorService", "o"),
];

fn services(version: &str) -> Option<&'static [(&'static str, &'static str)]> {
    match version {
        "v201402" => Some(V201402),
        _ => None,
    }
}

/// Returns `true` if `version` is supported.
#[must_use]
pub fn is_supported_version(version: &str) -> bool {
    services(version).is_some()
}

/// The URL namespace (`cm`, `mcm`, ...) of `service` in `version`.
#[must_use]
pub fn service_namespace(version: &str, service: &str) -> Option<&'static str> {
    services(version)?
        .iter()
        .find(|(name, _)| *name == service)
        .map(|(_, namespace)| *namespace)
}

/// All services of `version`, sorted; empty for unknown versions.
#[must_use]
pub fn services_for(version: &str) -> Vec<&'static str> {
    let mut names: Vec<&'static str> = services(version)
        .unwrap_or_default()
        .iter()
        .map(|(name, _)| *name)
        .collect();
    names.sort_unstable();
    names
}

/// The SOAP endpoint of a service.
#[must_use]
pub fn service_url(server: &str, namespace: &str, version: &str, service: &str) -> String {
    format!("{server}/api/adwords/{namespace}/{version}/{service}")
}

/// The report download endpoint.
#[must_use]
pub fn report_download_url(server: &str, version: &str) -> String {
    format!("{server}/api/adwords/reportdownload/{version}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_namespaces() {
        assert_eq!(service_namespace("v201402", "CampaignService"), Some("cm"));
        assert_eq!(service_namespace("v201402", "ManagedCustomerService"), Some("mcm"));
        assert_eq!(service_namespace("v201402", "TargetingIdeaService"), Some("o"));
        assert_eq!(service_namespace("v201402", "BudgetOrderService"), Some("billing"));
        assert_eq!(service_namespace("v201402", "FooService"), None);
        assert_eq!(service_namespace("v201309", "CampaignService"), None);
    }

    #[test]
    fn test_services_for() {
        assert_eq!(services_for("v201402").len(), 34);
        assert!(services_for("v201309").is_empty());
    }

    #[test]
    fn test_urls() {
        assert_eq!(
            service_url("https://adwords.google.com", "mcm", "v201402", "CustomerService"),
            "https://adwords.google.com/api/adwords/mcm/v201402/CustomerService"
        );
        assert_eq!(
            report_download_url("https://adwords.google.com", "v201402"),
            "https://adwords.google.com/api/adwords/reportdownload/v201402"
        );
    }
}
