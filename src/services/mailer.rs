/// Transactional email through the Resend HTTP API
use serde::Serialize;

use crate::config::AppConfig;
use crate::models::{Listing, PrintOrder, PrintOrderStatus, User};
use crate::utils::escape_html;

const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Debug, Serialize)]
struct ResendPayload<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

#[derive(Debug, Clone)]
pub struct Mailer {
    api_key: Option<String>,
    from: String,
    admin_email: String,
    client: reqwest::Client,
}

impl Mailer {
    pub fn from_config(config: &AppConfig) -> Self {
        if config.resend_api_key.is_none() {
            log::warn!("RESEND_API_KEY not set, notification emails are disabled");
        }
        Self {
            api_key: config.resend_api_key.clone(),
            from: config.mail_from.clone(),
            admin_email: config.admin_email.clone(),
            client: reqwest::Client::new(),
        }
    }

    pub fn admin_email(&self) -> &str {
        &self.admin_email
    }

    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    pub async fn send(&self, email: &Email) -> Result<(), String> {
        let api_key = match &self.api_key {
            Some(key) => key,
            None => {
                log::debug!("Email to {} skipped (mailer disabled): {}", email.to, email.subject);
                return Ok(());
            }
        };

        let payload = ResendPayload {
            from: &self.from,
            to: [&email.to],
            subject: &email.subject,
            html: &email.html,
        };

        let response = self
            .client
            .post(RESEND_ENDPOINT)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| format!("Mailer request error: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(format!("Mailer error {}: {}", status, error_text));
        }

        log::info!("📧 Email sent to {}: {}", email.to, email.subject);
        Ok(())
    }

    /// Fire-and-forget: the request never waits for (or fails because of) email delivery
    pub fn send_in_background(&self, email: Email) {
        if !self.is_enabled() {
            return;
        }
        let mailer = self.clone();
        tokio::spawn(async move {
            if let Err(e) = mailer.send(&email).await {
                log::error!("Failed to send email to {}: {}", email.to, e);
            }
        });
    }
}

// ========== Templates ==========

fn layout(title: &str, body: &str) -> String {
    format!(
        "<div style=\"font-family:Arial,sans-serif;max-width:600px\"><h2>{}</h2>{}<p style=\"color:#888\">PrintKart</p></div>",
        title, body
    )
}

fn row(label: &str, value: &str) -> String {
    format!("<li><b>{}:</b> {}</li>", label, escape_html(value))
}

fn label<T: Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

pub fn new_listing_for_admin(admin: &str, listing: &Listing, seller: &User) -> Email {
    let body = format!(
        "<h3>Seller</h3><ul>{}{}{}</ul><h3>Book</h3><ul>{}{}{}{}{}{}</ul><p><a href=\"{}\">View image</a></p>",
        row("Name", &seller.fullname),
        row("Email", &seller.email),
        row("Mobile", &seller.mobile_number),
        row("Title", &listing.name),
        row("Category", &label(&listing.category)),
        row("Condition", &label(&listing.condition)),
        row("Sell type", &label(&listing.selltype)),
        row("Location", &listing.location),
        row("Price", &format!("₹{:.2}", listing.price)),
        escape_html(&listing.image),
    );
    Email {
        to: admin.to_string(),
        subject: format!("New book listed: {}", listing.name),
        html: layout("New book awaiting review", &body),
    }
}

pub fn listing_moderated(seller: &User, listing: &Listing) -> Email {
    let body = format!(
        "<p>Hi {}, your listing <b>{}</b> is now <b>{}</b>.</p>{}",
        escape_html(&seller.fullname),
        escape_html(&listing.name),
        label(&listing.status),
        listing
            .updated_price
            .map(|p| format!("<p>Listed price: ₹{:.2}</p>", p))
            .unwrap_or_default(),
    );
    Email {
        to: seller.email.clone(),
        subject: format!("Your listing \"{}\" was {}", listing.name, label(&listing.status).to_lowercase()),
        html: layout("Listing update", &body),
    }
}

pub fn book_ordered(to: &str, listing: &Listing, buyer: &User) -> Email {
    let body = format!(
        "<p><b>{}</b> was ordered.</p><ul>{}{}{}</ul>",
        escape_html(&listing.name),
        row("Buyer", &buyer.fullname),
        row("Email", &buyer.email),
        row("Mobile", &buyer.mobile_number),
    );
    Email {
        to: to.to_string(),
        subject: format!("Book ordered: {}", listing.name),
        html: layout("New book order", &body),
    }
}

fn print_details(order: &PrintOrder) -> String {
    format!(
        "<ul>{}{}{}{}{}{}{}</ul>",
        row("Name", &order.name),
        row("Mobile", &order.mobile),
        row("File", &order.file_name),
        row("Colour", &label(&order.color)),
        row("Sides", &label(&order.sides)),
        row("Binding", &label(&order.binding)),
        row("Copies", &order.copies.to_string()),
    )
}

pub fn print_order_for_admin(admin: &str, order: &PrintOrder) -> Email {
    let body = format!(
        "{}<ul>{}{}</ul><p><a href=\"{}\">Document</a> · <a href=\"{}\">Payment proof</a></p>",
        print_details(order),
        row("Transaction", order.transaction_id.as_deref().unwrap_or("-")),
        row("Coupon", order.coupon_code.as_deref().unwrap_or("-")),
        escape_html(&order.file),
        escape_html(&order.payment_proof),
    );
    Email {
        to: admin.to_string(),
        subject: format!("New print order from {}", order.name),
        html: layout("New print order", &body),
    }
}

pub fn print_order_received(to: &str, order: &PrintOrder) -> Email {
    let body = format!(
        "<p>We received your print order. We'll let you know when it moves along.</p>{}",
        print_details(order)
    );
    Email {
        to: to.to_string(),
        subject: "Your print order was received".to_string(),
        html: layout("Order received", &body),
    }
}

pub fn print_status_changed(to: &str, order: &PrintOrder, status: PrintOrderStatus) -> Email {
    let body = format!(
        "<p>Your print order for <b>{}</b> is now <b>{}</b>.</p>",
        escape_html(&order.file_name),
        status.as_str()
    );
    Email {
        to: to.to_string(),
        subject: format!("Print order {}", status.as_str().to_lowercase()),
        html: layout("Order update", &body),
    }
}

pub fn password_reset_code(to: &str, otp: &str) -> Email {
    let body = format!(
        "<p>Your password reset code is</p><p style=\"font-size:24px;letter-spacing:4px\"><b>{}</b></p><p>It expires in 10 minutes. Ignore this email if you did not ask for it.</p>",
        escape_html(otp)
    );
    Email {
        to: to.to_string(),
        subject: "Your PrintKart password reset code".to_string(),
        html: layout("Password reset", &body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BookCategory, BookCondition, ModerationStatus, SellType, StockStatus};
    use chrono::Utc;

    fn seller() -> User {
        User::new(
            "<script>Ravi</script>".to_string(),
            "9876543210".to_string(),
            "ravi@example.com".to_string(),
            "hash".to_string(),
        )
    }

    fn listing() -> Listing {
        Listing {
            id: None,
            name: "Engineering Maths".to_string(),
            image: "http://localhost/uploads/sellbooks/a.png".to_string(),
            image_key: "sellbooks/a.png".to_string(),
            price: 250.0,
            condition: BookCondition::LikeNew,
            description: "Clean copy".to_string(),
            location: "Vizag".to_string(),
            category: BookCategory::CollegeBooks,
            subcategory: None,
            selltype: SellType::Sell,
            user_id: "u1".to_string(),
            status: ModerationStatus::Accepted,
            updated_price: Some(200.0),
            soldstatus: StockStatus::Instock,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_admin_listing_email_escapes_user_text() {
        let email = new_listing_for_admin("admin@test", &listing(), &seller());
        assert_eq!(email.to, "admin@test");
        assert!(email.html.contains("&lt;script&gt;Ravi&lt;/script&gt;"));
        assert!(!email.html.contains("<script>"));
        assert!(email.html.contains("Like New"));
        assert!(email.html.contains("College &amp; University Books"));
    }

    #[test]
    fn test_moderation_email_mentions_status_and_price() {
        let email = listing_moderated(&seller(), &listing());
        assert_eq!(email.to, "ravi@example.com");
        assert!(email.subject.contains("accepted"));
        assert!(email.html.contains("₹200.00"));
    }

    #[test]
    fn test_reset_code_email() {
        let email = password_reset_code("a@b.co", "123456");
        assert!(email.html.contains("123456"));
    }

    #[tokio::test]
    async fn test_disabled_mailer_skips_sending() {
        let mailer = Mailer::from_config(&AppConfig::for_tests());
        assert!(!mailer.is_enabled());
        assert!(mailer.send(&password_reset_code("a@b.co", "123456")).await.is_ok());
    }
}
