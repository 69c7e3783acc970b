//! `paineel check`: one line per external service.

use paineel_captcha::{RemoteSolver, TwoCaptchaClient};
use paineel_core::AppConfig;
use paineel_ledger::{LedgerStore, SheetsLedger};
use paineel_mail::SmtpMailer;

pub struct CheckOptions {
    pub captcha: bool,
    pub smtp: bool,
    pub ledger: bool,
}

/// Run the selected checks. Returns whether all of them passed.
pub async fn run(config: &AppConfig, options: &CheckOptions) -> bool {
    let mut all_ok = true;

    if options.captcha {
        let result = match TwoCaptchaClient::new(&config.captcha) {
            Ok(client) => client
                .balance()
                .await
                .map(|balance| format!("balance {balance:.2}"))
                .map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        all_ok &= report("captcha service", result);
    }

    if options.smtp {
        let result = match SmtpMailer::new(&config.smtp) {
            Ok(mailer) => match mailer.test_connection().await {
                Ok(true) => Ok(format!("{}:{}", config.smtp.server, config.smtp.port)),
                Ok(false) => Err("server refused the connection".to_string()),
                Err(e) => Err(e.to_string()),
            },
            Err(e) => Err(e.to_string()),
        };
        all_ok &= report("SMTP server", result);
    }

    if options.ledger {
        let result = match SheetsLedger::connect(&config.ledger).await {
            Ok(ledger) => ledger
                .column_values(1)
                .await
                .map(|keys| format!("{} row(s) in column A", keys.len().saturating_sub(1)))
                .map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        all_ok &= report("ledger", result);
    }

    all_ok
}

fn report(service: &str, result: Result<String, String>) -> bool {
    match result {
        Ok(detail) => {
            println!("[ OK ] {service}: {detail}");
            true
        }
        Err(reason) => {
            println!("[FAIL] {service}: {reason}");
            false
        }
    }
}
