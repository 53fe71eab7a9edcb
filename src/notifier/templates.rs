use super::{EmailMessage, SessionDetails, SignatureEmail, TeacherSignatureEmail};

fn escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub fn session_line(session: &SessionDetails) -> String {
    format!(
        "{} ({}) - {} {}-{}",
        session.title,
        session.classroom_name,
        session.starts_at.format("%d/%m/%Y"),
        session.starts_at.format("%H:%M"),
        session.ends_at.format("%H:%M"),
    )
}

fn layout(title: &str, content: &str, signature_url: &str) -> String {
    format!(
        r##"<!DOCTYPE html>
<html lang="fr">
<head>
    <meta charset="UTF-8">
    <title>{title}</title>
</head>
<body style="margin: 0; padding: 24px; font-family: Arial, sans-serif; color: #1f2937;">
    <h1 style="font-size: 20px;">{title}</h1>
    {content}
    <p style="margin: 32px 0;">
        <a href="{url}" style="background: #2563eb; color: white; padding: 12px 24px; border-radius: 8px; text-decoration: none;">Signer</a>
    </p>
    <p style="font-size: 12px; color: #6b7280;">Ce lien est personnel et ne peut être utilisé qu'une seule fois.</p>
</body>
</html>"##,
        title = escape(title),
        content = content,
        url = escape(signature_url),
    )
}

pub fn signature_request(email: &SignatureEmail) -> EmailMessage {
    let subject = format!("Émargement : {}", email.session.title);
    let line = session_line(&email.session);

    let content = format!(
        "<p>Bonjour {},</p><p>Merci de signer votre présence pour la session :</p><p><strong>{}</strong></p>",
        escape(&email.recipient_name),
        escape(&line),
    );

    let body_text = format!(
        "Bonjour {},\n\nMerci de signer votre présence pour la session :\n{}\n\n{}\n",
        email.recipient_name, line, email.signature_url,
    );

    EmailMessage {
        to: email.recipient_email.clone(),
        body_html: layout(&subject, &content, &email.signature_url),
        subject,
        body_text,
    }
}

pub fn teacher_signature_request(email: &TeacherSignatureEmail) -> EmailMessage {
    let subject = format!("Signature formateur : {}", email.session.title);
    let line = session_line(&email.session);

    let mut content = format!(
        "<p>Bonjour {},</p><p>Merci de signer la feuille d'émargement de la session :</p><p><strong>{}</strong></p>",
        escape(&email.recipient_name),
        escape(&line),
    );
    let mut body_text = format!(
        "Bonjour {},\n\nMerci de signer la feuille d'émargement de la session :\n{}\n\n{}\n",
        email.recipient_name, line, email.signature_url,
    );

    if !email.pending_sessions.is_empty() {
        content.push_str("<p>Autres sessions en attente de votre signature :</p><ul>");
        body_text.push_str("\nAutres sessions en attente de votre signature :\n");
        for pending in &email.pending_sessions {
            let pending_line = session_line(pending);
            content.push_str(&format!("<li>{}</li>", escape(&pending_line)));
            body_text.push_str(&format!("- {}\n", pending_line));
        }
        content.push_str("</ul>");
    }

    EmailMessage {
        to: email.recipient_email.clone(),
        body_html: layout(&subject, &content, &email.signature_url),
        subject,
        body_text,
    }
}
