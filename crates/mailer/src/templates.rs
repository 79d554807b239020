//! Message bodies for every email the backend sends.

use crate::Email;

/// What a recipient needs to know about an appointment.
#[derive(Debug, Clone)]
pub struct AppointmentNotice {
    pub doctor_name: String,
    pub patient_name: String,
    pub date: String,
    pub time: String,
}

impl AppointmentNotice {
    fn when(&self) -> String {
        format!("{} at {}", self.date, self.time)
    }
}

pub fn verification(app_url: &str, to: &str, name: &str, token: &str) -> Email {
    let link = format!("{}/auth/new-verification?token={token}", base(app_url));
    Email {
        to: to.to_owned(),
        subject: "Confirm your email".to_owned(),
        text: format!("Hello {name},\n\nPlease confirm your email address by opening {link}\n"),
    }
}

pub fn password_reset(app_url: &str, to: &str, name: &str, token: &str) -> Email {
    let link = format!("{}/auth/new-password?token={token}", base(app_url));
    Email {
        to: to.to_owned(),
        subject: "Reset your password".to_owned(),
        text: format!(
            "Hello {name},\n\nOpen {link} to choose a new password. \
             If you did not ask for this you can ignore this message.\n"
        ),
    }
}

pub fn appointment_received(to: &str, notice: &AppointmentNotice) -> Email {
    Email {
        to: to.to_owned(),
        subject: "Appointment request received".to_owned(),
        text: format!(
            "The appointment of {} with Dr. {} on {} has been received and is awaiting confirmation.\n",
            notice.patient_name,
            notice.doctor_name,
            notice.when()
        ),
    }
}

pub fn appointment_confirmed(to: &str, notice: &AppointmentNotice) -> Email {
    Email {
        to: to.to_owned(),
        subject: "Appointment confirmed".to_owned(),
        text: format!(
            "The appointment of {} with Dr. {} on {} is confirmed.\n",
            notice.patient_name,
            notice.doctor_name,
            notice.when()
        ),
    }
}

pub fn appointment_cancelled(to: &str, notice: &AppointmentNotice) -> Email {
    Email {
        to: to.to_owned(),
        subject: "Appointment cancelled".to_owned(),
        text: format!(
            "The appointment of {} with Dr. {} on {} has been cancelled.\n",
            notice.patient_name,
            notice.doctor_name,
            notice.when()
        ),
    }
}

fn base(app_url: &str) -> &str {
    app_url.trim_end_matches('/')
}
