use std::cmp::Ordering;

use log::debug;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseInfo {
    pub tag_name: String,
    #[serde(default)]
    pub html_url: String,
}

/// Ask the release API whether a launcher build newer than `current_version` exists.
///
/// # Errors
/// Returns an error string if the request fails or the response is invalid.
pub async fn newer_launcher_release(
    client: &reqwest::Client,
    api_url: &str,
    current_version: &str,
) -> Result<Option<ReleaseInfo>, String> {
    let response = client
        .get(api_url)
        .header("User-Agent", "shinecore-launcher")
        .send()
        .await
        .map_err(|err| format!("release check failed: {err}"))?;

    if !response.status().is_success() {
        return Err(format!("release API returned status: {}", response.status()));
    }

    let release: ReleaseInfo = response
        .json()
        .await
        .map_err(|err| format!("failed to parse release info: {err}"))?;

    debug!(
        "release: latest tag {} vs running {}",
        release.tag_name, current_version
    );
    Ok(is_newer(&release.tag_name, current_version).then_some(release))
}

/// `true` when `candidate` is a strictly higher dotted version than `current`.
pub fn is_newer(candidate: &str, current: &str) -> bool {
    compare_versions(candidate, current) == Ordering::Greater
}

fn compare_versions(a: &str, b: &str) -> Ordering {
    let a = version_parts(a);
    let b = version_parts(b);
    let len = a.len().max(b.len());
    (0..len)
        .map(|i| {
            let left = a.get(i).copied().unwrap_or(0);
            let right = b.get(i).copied().unwrap_or(0);
            left.cmp(&right)
        })
        .find(|ord| ord.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// `"v1.2.3-beta"` -> `[1, 2, 3]`; a non-numeric segment ends the version.
fn version_parts(version: &str) -> Vec<u32> {
    version
        .trim()
        .trim_start_matches('v')
        .split(['.', '-', '+'])
        .map_while(|part| part.parse::<u32>().ok())
        .collect()
}
