/// Constants used throughout the terra-stac codebase
// Internal document fields
pub const AUTH_FIELD: &str = "_auth";
pub const HIDDEN_FIELD_PREFIX: &str = "_";

// Request parameters overriding the `_auth` object of a collection body
pub const AUTH_READ_PARAM: &str = "_auth_read";
pub const AUTH_WRITE_PARAM: &str = "_auth_write";

// Default role names
pub const DEFAULT_ROLE_ADMIN: &str = "stac-admin";
pub const DEFAULT_ROLE_EDITOR: &str = "stac-editor";
pub const DEFAULT_ROLE_ANONYMOUS: &str = "anonymous";

// Default claim path holding the role list of a verified token
pub const DEFAULT_ROLES_CLAIM: &str = "realm_access.roles";

// Authentication challenge returned with every 401
pub const BEARER_CHALLENGE: &str = "Bearer";
