use rust_decimal::Decimal;
use triplicity_accounts::User;
use triplicity_core::notify::Email;

use crate::models::Booking;

/// Formats an amount with the symbol for the booking currency, e.g. `₹3000.00`.
pub fn format_amount(amount: Decimal, currency: &str) -> String {
    let amount = amount.round_dp(2);
    match currency.to_ascii_lowercase().as_str() {
        "inr" => format!("₹{:.2}", amount),
        "usd" => format!("${:.2}", amount),
        "eur" => format!("€{:.2}", amount),
        "gbp" => format!("£{:.2}", amount),
        other => format!("{} {:.2}", other.to_ascii_uppercase(), amount),
    }
}

pub fn confirmation_email(brand: &str, user: &User, booking: &Booking, package_title: &str) -> Email {
    let subject = format!("Your {} Booking #{} is Confirmed!", brand, booking.id);
    let total = format_amount(booking.total_amount, &booking.currency);
    let body = format!(
        "Dear {name},\n\
         \n\
         Thank you for booking \"{title}\" ({persons} person(s), total {total}).\n\
         \n\
         Booking ID: {id}\n\
         Package: {title}\n\
         Persons: {persons}\n\
         Total Paid: {total}\n\
         Booking Date: {date}\n\
         Status: Confirmed\n\
         \n\
         We look forward to being a part of your journey!\n\
         - {brand} Team\n",
        name = user.full_name(),
        title = package_title,
        persons = booking.person_count,
        total = total,
        id = booking.id,
        date = booking.created_at.date_naive(),
        brand = brand,
    );
    Email::new(user.email.clone(), subject, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewBooking;
    use rust_decimal_macros::dec;
    use triplicity_accounts::NewUser;
    use uuid::Uuid;

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(dec!(3000), "inr"), "₹3000.00");
        assert_eq!(format_amount(dec!(12.5), "USD"), "$12.50");
        assert_eq!(format_amount(dec!(7), "jpy"), "JPY 7.00");
    }

    #[test]
    fn test_confirmation_email() {
        let user = NewUser {
            email: "anita@example.com".to_string(),
            password_hash: String::new(),
            first_name: "Anita".to_string(),
            last_name: "Desai".to_string(),
        }
        .into_user(Uuid::new_v4());
        let booking = NewBooking {
            user_id: user.id,
            package_id: 3,
            person_count: 3,
            total_amount: dec!(3000.00),
            currency: "inr".to_string(),
        }
        .into_booking(42);

        let email = confirmation_email("Triplicity", &user, &booking, "Goa Beach Escape");

        assert_eq!(email.subject, "Your Triplicity Booking #42 is Confirmed!");
        assert_eq!(email.recipient(), "anita@example.com");
        assert!(email.body.starts_with("Dear Anita Desai,"));
        assert!(email.body.contains("Package: Goa Beach Escape\n"));
        assert!(email.body.contains("Persons: 3\n"));
        assert!(email.body.contains("Total Paid: ₹3000.00\n"));
        assert!(email.body.contains("Status: Confirmed\n"));
    }
}
