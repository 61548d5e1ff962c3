use triplicity_core::notify::Email;

use crate::user::User;
use crate::verification::EmailVerificationCode;

pub fn welcome_email(brand: &str, user: &User, code: &EmailVerificationCode) -> Email {
    let subject = format!("Welcome to {}!", brand);
    let body = format!(
        "Welcome to {brand}, {name}!\n\
         \n\
         Thank you for joining our travel community. Your account has been successfully created.\n\
         \n\
         Account Details:\n\
         - Email: {email}\n\
         - Registration: {registered}\n\
         \n\
         Your email verification code is {code}. It expires at {expires} UTC.\n\
         \n\
         Happy travels!\n\
         The {brand} Team\n",
        brand = brand,
        name = user.full_name(),
        email = user.email,
        registered = user.created_at.format("%B %d, %Y"),
        code = code.code,
        expires = code.expires_at.format("%H:%M"),
    );
    Email::new(user.email.clone(), subject, body)
}

pub fn verification_email(brand: &str, user: &User, code: &EmailVerificationCode) -> Email {
    let subject = format!("Your {} verification code", brand);
    let body = format!(
        "Dear {name},\n\
         \n\
         Your email verification code is {code}. It expires at {expires} UTC.\n\
         \n\
         - {brand} Team\n",
        name = user.full_name(),
        code = code.code,
        expires = code.expires_at.format("%H:%M"),
        brand = brand,
    );
    Email::new(user.email.clone(), subject, body)
}
