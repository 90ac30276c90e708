//! Standard XACML 3.0 identifier URNs used throughout the engine.

/// Attribute category for the access subject.
pub const CATEGORY_ACCESS_SUBJECT: &str =
    "urn:oasis:names:tc:xacml:1.0:subject-category:access-subject";
/// Attribute category for the resource.
pub const CATEGORY_RESOURCE: &str =
    "urn:oasis:names:tc:xacml:3.0:attribute-category:resource";
/// Attribute category for the action.
pub const CATEGORY_ACTION: &str = "urn:oasis:names:tc:xacml:3.0:attribute-category:action";
/// Attribute category for the environment.
pub const CATEGORY_ENVIRONMENT: &str =
    "urn:oasis:names:tc:xacml:3.0:attribute-category:environment";

/// Well-known resource identifier attribute.
pub const ATTR_RESOURCE_ID: &str = "urn:oasis:names:tc:xacml:1.0:resource:resource-id";
/// Well-known resource scope attribute (multi-resource profile).
pub const ATTR_RESOURCE_SCOPE: &str = "urn:oasis:names:tc:xacml:1.0:resource:scope";

/// PDP-issued environment attribute: current time of day.
pub const ATTR_CURRENT_TIME: &str = "urn:oasis:names:tc:xacml:1.0:environment:current-time";
/// PDP-issued environment attribute: current date.
pub const ATTR_CURRENT_DATE: &str = "urn:oasis:names:tc:xacml:1.0:environment:current-date";
/// PDP-issued environment attribute: current date and time.
pub const ATTR_CURRENT_DATETIME: &str =
    "urn:oasis:names:tc:xacml:1.0:environment:current-dateTime";

/// Status code: evaluation succeeded.
pub const STATUS_OK: &str = "urn:oasis:names:tc:xacml:1.0:status:ok";
/// Status code: a mustBePresent attribute could not be resolved.
pub const STATUS_MISSING_ATTRIBUTE: &str =
    "urn:oasis:names:tc:xacml:1.0:status:missing-attribute";
/// Status code: a lexical value violated its datatype's schema.
pub const STATUS_SYNTAX_ERROR: &str = "urn:oasis:names:tc:xacml:1.0:status:syntax-error";
/// Status code: any other evaluation failure.
pub const STATUS_PROCESSING_ERROR: &str =
    "urn:oasis:names:tc:xacml:1.0:status:processing-error";

/// `resource-scope` value covering only the named resource.
pub const RESOURCE_SCOPE_IMMEDIATE: &str = "Immediate";
/// `resource-scope` value covering the resource's direct children.
pub const RESOURCE_SCOPE_CHILDREN: &str = "Children";
/// `resource-scope` value covering the resource's whole subtree.
pub const RESOURCE_SCOPE_DESCENDANTS: &str = "Descendants";
