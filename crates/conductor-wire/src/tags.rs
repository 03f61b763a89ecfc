//! The fixed request-tag vocabulary of the emulated conductor API.
//!
//! These strings come from `@holochain/conductor-api` and are treated as an
//! opaque vocabulary: the mock never interprets them beyond matching.

/// App interface: fetch installed-app info.
pub const APP_INFO: &str = "app_info";
/// App interface: invoke a zome function. Responses for this tag are
/// doubly encoded on the wire.
pub const ZOME_CALL: &str = "zome_call_invocation";
/// Admin interface: activate an installed app.
pub const ACTIVATE_APP: &str = "activate_app";
/// Admin interface: attach a new app interface port.
pub const ATTACH_APP_INTERFACE: &str = "attach_app_interface";
/// Admin interface: deactivate an app.
pub const DEACTIVATE_APP: &str = "deactivate_app";
/// Admin interface: dump conductor state.
pub const DUMP_STATE: &str = "dump_state";
/// Admin interface: generate an agent keypair.
pub const GENERATE_AGENT_PUB_KEY: &str = "generate_agent_pub_key";
/// Admin interface: install an app bundle.
pub const INSTALL_APP: &str = "install_app";
/// Admin interface: list installed DNAs.
pub const LIST_DNAS: &str = "list_dnas";
/// Admin interface: list cell ids.
pub const LIST_CELL_IDS: &str = "list_cell_ids";
/// Admin interface: list active app ids.
pub const LIST_ACTIVE_APP_IDS: &str = "list_active_app_ids";

/// Internal sentinel keying the `next` queue. Never appears on the wire.
pub const NEXT: &str = "next";

/// Reply tag for synthesized error responses.
pub const ERROR: &str = "error";
/// Outer frame tag on every reply.
pub const RESPONSE: &str = "Response";
/// Outer frame tag on unsolicited signal pushes.
pub const SIGNAL: &str = "Signal";

/// Every tag a response may be registered under, sentinel included.
pub const REQUEST_TAGS: [&str; 12] = [
    APP_INFO,
    ZOME_CALL,
    ACTIVATE_APP,
    ATTACH_APP_INTERFACE,
    DEACTIVATE_APP,
    DUMP_STATE,
    GENERATE_AGENT_PUB_KEY,
    INSTALL_APP,
    LIST_DNAS,
    LIST_CELL_IDS,
    LIST_ACTIVE_APP_IDS,
    NEXT,
];

/// Whether `tag` belongs to the registration vocabulary.
pub fn is_request_tag(tag: &str) -> bool {
    REQUEST_TAGS.contains(&tag)
}
