//! Services available in each supported Ad Manager API version.

/// The canonical Ad Manager endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://ads.google.com";

/// Versions known to this library, oldest first.
pub const SUPPORTED_VERSIONS: &[&str] = &["v202311", "v202402", "v202405", "v202408"];

/// The version used when none is requested.
pub const LATEST_VERSION: &str = "v202408";

const SHARED_SERVICES: &[&str] = &[
    "AdjustmentService",
    "AdRuleService",
    "AudienceSegmentService",
    "CdnConfigurationService",
    "CmsMetadataService",
    "CompanyService",
    "ContactService",
    "ContentBundleService",
    "ContentService",
    "CreativeService",
    "CreativeSetService",
    "CreativeTemplateService",
    "CreativeWrapperService",
    "CustomFieldService",
    "CustomTargetingService",
    "DaiAuthenticationKeyService",
    "DaiEncodingProfileService",
    "ForecastService",
    "InventoryService",
    "LabelService",
    "LineItemCreativeAssociationService",
    "LineItemService",
    "LineItemTemplateService",
    "LiveStreamEventService",
    "MobileApplicationService",
    "NativeStyleService",
    "NetworkService",
    "OrderService",
    "PlacementService",
    "ProposalLineItemService",
    "ProposalService",
    "PublisherQueryLanguageService",
    "ReportService",
    "SegmentPopulationService",
    "SiteService",
    "StreamActivityMonitorService",
    "SuggestedAdUnitService",
    "TargetingPresetService",
    "TeamService",
    "UserService",
    "UserTeamAssociationService",
    "YieldGroupService",
];

fn version_specific(version: &str) -> Option<&'static [&'static str]> {
    match version {
        "v202311" => Some(&[
            "ActivityGroupService",
            "ActivityService",
            "CreativeReviewService",
        ]),
        "v202402" => Some(&["ActivityGroupService", "ActivityService"]),
        "v202405" => Some(&[]),
        "v202408" => Some(&["AdsTxtService"]),
        _ => None,
    }
}

/// Returns `true` if `version` is supported.
#[must_use]
pub fn is_supported_version(version: &str) -> bool {
    version_specific(version).is_some()
}

/// Returns `true` if `service` exists in `version`.
#[must_use]
pub fn is_supported_service(version: &str, service: &str) -> bool {
    version_specific(version).is_some_and(|extra| {
        SHARED_SERVICES.contains(&service) || extra.contains(&service)
    })
}

/// All services of `version`, sorted; empty for unknown versions.
#[must_use]
pub fn services_for(version: &str) -> Vec<&'static str> {
    let Some(extra) = version_specific(version) else {
        return Vec::new();
    };
    let mut services: Vec<&'static str> = SHARED_SERVICES.iter().chain(extra).copied().collect();
    services.sort_unstable();
    services
}

/// The SOAP endpoint of a service.
#[must_use]
pub fn service_url(server: &str, version: &str, service: &str) -> String {
    format!("{server}/apis/ads/publisher/{version}/{service}")
}
