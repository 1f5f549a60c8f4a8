//! robots.txt policy with a per-origin cache

use std::collections::HashMap;

use reqwest::{Client, StatusCode};
use texting_robots::Robot;
use tokio::sync::Mutex;
use tracing::{info, warn};
use url::Url;

/// What a site's robots.txt lets us do
enum Rules {
    AllowAll,
    DenyAll,
    Parsed(Robot),
}

/// Caches one parsed robots.txt per origin for the life of the process
pub struct RobotsPolicy {
    client: Client,
    agent: String,
    rules: Mutex<HashMap<String, Rules>>,
}

/// `scheme://host[:port]` of a URL
pub fn origin_of(url: &Url) -> String {
    url.origin().ascii_serialization()
}

impl RobotsPolicy {
    pub fn new(client: Client, agent: impl Into<String>) -> Self {
        Self {
            client,
            agent: agent.into(),
            rules: Mutex::new(HashMap::new()),
        }
    }

    /// Whether `url` may be fetched. Reads the origin's robots.txt on first use.
    pub async fn allowed(&self, url: &Url) -> bool {
        let origin = origin_of(url);
        let mut rules = self.rules.lock().await;

        if !rules.contains_key(&origin) {
            let loaded = self.load(&origin).await;
            rules.insert(origin.clone(), loaded);
        }

        let allowed = match rules.get(&origin) {
            Some(Rules::Parsed(robot)) => robot.allowed(url.as_str()),
            Some(Rules::DenyAll) => false,
            Some(Rules::AllowAll) | None => true,
        };

        if !allowed {
            warn!("URL blocked by robots.txt: {}", url);
        }
        allowed
    }

    async fn load(&self, origin: &str) -> Rules {
        let robots_url = format!("{}/robots.txt", origin);

        let response = match self.client.get(&robots_url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Could not read robots.txt from {}: {}", origin, e);
                return Rules::AllowAll;
            }
        };

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            warn!("robots.txt at {} is access controlled ({}), treating site as disallowed", origin, status);
            return Rules::DenyAll;
        }
        if !status.is_success() {
            info!("No robots.txt at {} ({}), allowing all", origin, status);
            return Rules::AllowAll;
        }

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                warn!("Could not read robots.txt body from {}: {}", origin, e);
                return Rules::AllowAll;
            }
        };

        match Robot::new(&self.agent, &body) {
            Ok(robot) => {
                info!("robots.txt read from {}", origin);
                Rules::Parsed(robot)
            }
            Err(e) => {
                warn!("Could not parse robots.txt from {}: {}", origin, e);
                Rules::AllowAll
            }
        }
    }
}
