use crate::error::Result;
use chromiumoxide::cdp::browser_protocol::emulation::SetTimezoneOverrideParams;
use chromiumoxide::Page;
use rand::Rng;

/// Desktop user agents presented to the target site
const USER_AGENTS: [&str; 3] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
];

/// Fingerprint configuration so the session does not look automated
#[derive(Debug, Clone)]
pub struct FingerprintConfig {
    pub user_agent: String,
    pub timezone: String,
    pub accept_language: String,
}

impl FingerprintConfig {
    /// Pick a random user agent, with a Brazilian locale and timezone
    pub fn randomized() -> Self {
        let mut rng = rand::thread_rng();
        let ua_idx = rng.gen_range(0..USER_AGENTS.len());

        Self {
            user_agent: USER_AGENTS[ua_idx].to_string(),
            timezone: "America/Sao_Paulo".to_string(),
            accept_language: "pt-BR,pt;q=0.9".to_string(),
        }
    }

    /// Chrome launch switches carrying this fingerprint.
    pub fn launch_args(&self) -> Vec<String> {
        vec![
            "--disable-blink-features=AutomationControlled".to_string(),
            format!("--user-agent={}", self.user_agent),
            format!("--lang={}", self.accept_language),
        ]
    }

    /// Apply the per-page overrides (webdriver flag, timezone).
    pub async fn apply(&self, page: &Page) -> Result<()> {
        page.enable_stealth_mode_with_agent(&self.user_agent).await?;
        page.execute(SetTimezoneOverrideParams::new(self.timezone.clone()))
            .await?;
        Ok(())
    }
}
