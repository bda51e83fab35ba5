use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::EmailConfig;
use crate::db::{Booking, Listing, User};
use crate::error::EmailError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), EmailError>;
}

pub fn render_booking_confirmation(booking: &Booking, listing: &Listing, guest: &User) -> EmailMessage {
    let greeting = guest
        .display_name
        .as_deref()
        .unwrap_or(guest.email.as_str());
    let nights = booking.nights();

    let body = format!(
        "Hello {greeting},\n\n\
         Your booking for \"{title}\" in {location} has been received.\n\n\
         Booking reference: {id}\n\
         Check-in:  {start}\n\
         Check-out: {end} ({nights} night{plural})\n\
         Total:     {total:.2}\n\
         Status:    {status:?}\n\n\
         Thank you for booking with us!\n",
        title = listing.title,
        location = listing.location,
        id = booking.booking_id,
        start = booking.start_date,
        end = booking.end_date,
        plural = if nights == 1 { "" } else { "s" },
        total = booking.total_price,
        status = booking.status,
    );

    EmailMessage {
        to: guest.email.clone(),
        subject: format!("Booking Confirmation - {}", listing.title),
        body,
    }
}

/// SMTP relay client.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &EmailConfig) -> Result<Self, EmailError> {
        let builder = if config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
        };
        let builder = builder.port(config.smtp_port);
        let builder = match (&config.username, &config.password) {
            (Some(username), Some(password)) => {
                builder.credentials(Credentials::new(username.clone(), password.clone()))
            }
            _ => builder,
        };

        Ok(Self {
            transport: builder.build(),
            from: config.from_address.parse()?,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(self.from.clone())
            .to(message.to.parse::<Mailbox>()?)
            .subject(message.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(message.body)?;

        self.transport.send(email).await?;
        Ok(())
    }
}
