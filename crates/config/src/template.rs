//! Default configuration template with all options documented.
//!
//! Written by `portalbot config init`. Every value matches the built-in
//! default, so an untouched file behaves exactly like no file at all.

/// Generate the default config template for the given portal URL.
pub fn default_config_template(portal_url: &str) -> String {
    format!(
        r##"# Portalbot Configuration
# =======================
# This file contains all available configuration options.
# Uncomment and modify settings as needed.
#
# Environment variable substitution is supported: ${{ENV_VAR}}
# Example: password = "${{PORTAL_PASSWORD}}"

# ══════════════════════════════════════════════════════════════════════════════
# PORTAL
# ══════════════════════════════════════════════════════════════════════════════

[portal]
url = "{portal_url}"
login_title_marker = "Work Order Management"  # Title substring shown after a successful login
login_timeout_ms = 20000                        # Wait for the identity check after submit
search_timeout_ms = 15000                       # Wait for a result row before "not found"
field_timeout_ms = 3000                         # Single wait per detail field before it counts as missing
coordinate_prefix = "PDO Coordenadas"           # Line prefix of the coordinates in the description

[portal.selectors]
username_field = "input[name='username']"
password_field = "input[name='password']"
login_button = "button[type='submit']"
search_field = "input[name='search']"
search_button = "button[name='searchButton']"
results_table = "table.results"

# Visible labels of the detail view
[portal.fields]
description = "Description"
fiber_color = "Fiber Color"
slid = "SLID"
address = "Address"
network_owner = "Network Owner"
primary_port = "Primary Port"
scheduled_date = "Scheduled Date"
intervention_state = "Intervention State"
view_detail = "View Detail"           # Context-menu entry that opens the details
close_detail = "Close"

# Controls clicked, in order, to move IN_PROGRESS to ALLOCATED
[portal.transition]
auto_allocation = "Advance Auto-Allocation"
evolve = "Evolve Work Order"
confirm = "Yes"
acknowledge = "OK"

# ══════════════════════════════════════════════════════════════════════════════
# BROWSER
# ══════════════════════════════════════════════════════════════════════════════

[browser]
headless = true
viewport_width = 1920
viewport_height = 1080
default_timeout_ms = 10000            # Starting wait bound for element lookups
navigation_timeout_ms = 30000
# chrome_path = "/usr/bin/chromium"   # Auto-detected when unset
# user_agent = "Mozilla/5.0 ..."
chrome_args = []

# ══════════════════════════════════════════════════════════════════════════════
# RESILIENCE
# ══════════════════════════════════════════════════════════════════════════════

[retry]
max_retries = 3                       # Attempts per lookup, the first one included
retry_base_delay_ms = 500
backoff_factor = 2.0

[adaptive]
min_timeout_ms = 2000
max_timeout_ms = 30000
growth_factor = 1.5                   # Applied after every failed wait
decay_factor = 0.8                    # Applied after success_threshold successes in a row
success_threshold = 3

[sessions]
max_parallel_sessions = 4
session_deadline_ms = 180000          # Login to release, per work order

# ══════════════════════════════════════════════════════════════════════════════
# CREDENTIALS
# ══════════════════════════════════════════════════════════════════════════════
# Prefer PORTALBOT_USERNAME / PORTALBOT_PASSWORD over storing secrets here.

[credentials]
# username = "${{PORTAL_USERNAME}}"
# password = "${{PORTAL_PASSWORD}}"
"##
    )
}
