use clinic_database::Appointment;
use clinic_mailer::{AppointmentNotice, Email, Mailer};
use tracing::warn;

/// Send an email. Delivery problems are logged and never fail the action.
pub async fn deliver(mailer: &dyn Mailer, email: Email) {
    let to = email.to.clone();
    let subject = email.subject.clone();
    if let Err(error) = mailer.send(email).await {
        warn!(%to, %subject, %error, transport = mailer.transport(), "email not delivered");
    }
}

/// Send the same appointment message to the patient and the doctor.
pub async fn appointment_parties(
    mailer: &dyn Mailer,
    appointment: &Appointment,
    render: fn(&str, &AppointmentNotice) -> Email,
) {
    let notice = AppointmentNotice {
        doctor_name: appointment.doctor_name.clone(),
        patient_name: appointment.patient_name.clone(),
        date: appointment.date.clone(),
        time: appointment.time.clone(),
    };

    for to in [&appointment.patient_email, &appointment.doctor_email] {
        deliver(mailer, render(to, &notice)).await;
    }
}
