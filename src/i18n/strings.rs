//! Static fallback text shown when a dictionary is missing or incomplete.
//!
//! These tables keep the navigation, hero and contact form usable even when
//! `/assets/i18n/{lang}.json` cannot be fetched. Lookup goes through the
//! requested language's table first, then the English table.

use crate::i18n::Language;

/// Key path to text pairs for one language.
pub type FallbackTable = &'static [(&'static str, &'static str)];

// ==================== English ====================

pub const ENGLISH_FALLBACK: FallbackTable = &[
    ("nav.home", "Home"),
    ("nav.services", "Services"),
    ("nav.portfolio", "Portfolio"),
    ("nav.about", "About"),
    ("nav.contact", "Contact"),
    ("hero.title", "Websites that grow your business"),
    ("hero.subtitle", "Design, development and SEO from one studio."),
    ("hero.cta", "Start a project"),
    ("services.title", "What we do"),
    ("contact.title", "Let's talk"),
    ("contact.form.name", "Name"),
    ("contact.form.email", "Email"),
    ("contact.form.message", "Message"),
    ("contact.form.submit", "Send message"),
    ("contact.form.success", "Thank you, {{name}}! We will get back to you soon."),
    ("contact.form.saved", "Your message was saved and will be sent later."),
    ("contact.form.error", "Something went wrong. Please try again."),
    ("contact.validation.name", "Please enter your name (at least 2 characters)."),
    ("contact.validation.email", "Please enter a valid email address."),
    ("contact.validation.message", "Please write a message (at least 10 characters)."),
    ("contact.captcha.label", "Solve: {{question}}"),
    ("contact.captcha.invalid", "Wrong answer, please try the new question."),
    ("footer.rights", "All rights reserved."),
    ("common.loading", "Loading..."),
    ("language.select", "Language"),
];

// ==================== Romanian ====================

pub const ROMANIAN_FALLBACK: FallbackTable = &[
    ("nav.home", "Acasă"),
    ("nav.services", "Servicii"),
    ("nav.portfolio", "Portofoliu"),
    ("nav.about", "Despre noi"),
    ("nav.contact", "Contact"),
    ("hero.title", "Site-uri care îți dezvoltă afacerea"),
    ("hero.subtitle", "Design, dezvoltare și SEO de la un singur studio."),
    ("hero.cta", "Începe un proiect"),
    ("services.title", "Ce facem"),
    ("contact.title", "Hai să vorbim"),
    ("contact.form.name", "Nume"),
    ("contact.form.email", "Email"),
    ("contact.form.message", "Mesaj"),
    ("contact.form.submit", "Trimite mesajul"),
    ("contact.form.success", "Mulțumim, {{name}}! Revenim în curând."),
    ("contact.form.saved", "Mesajul a fost salvat și va fi trimis mai târziu."),
    ("contact.form.error", "A apărut o eroare. Te rugăm să încerci din nou."),
    ("contact.validation.name", "Introdu numele (minim 2 caractere)."),
    ("contact.validation.email", "Introdu o adresă de email validă."),
    ("contact.validation.message", "Scrie un mesaj (minim 10 caractere)."),
    ("contact.captcha.label", "Rezolvă: {{question}}"),
    ("contact.captcha.invalid", "Răspuns greșit, încearcă noua întrebare."),
    ("footer.rights", "Toate drepturile rezervate."),
    ("common.loading", "Se încarcă..."),
    ("language.select", "Limba"),
];

// ==================== French ====================

pub const FRENCH_FALLBACK: FallbackTable = &[
    ("nav.home", "Accueil"),
    ("nav.services", "Services"),
    ("nav.portfolio", "Portfolio"),
    ("nav.about", "À propos"),
    ("nav.contact", "Contact"),
    ("hero.title", "Des sites qui font grandir votre entreprise"),
    ("contact.form.submit", "Envoyer le message"),
    ("footer.rights", "Tous droits réservés."),
    ("common.loading", "Chargement..."),
    ("language.select", "Langue"),
];

// ==================== German ====================

pub const GERMAN_FALLBACK: FallbackTable = &[
    ("nav.home", "Startseite"),
    ("nav.services", "Leistungen"),
    ("nav.portfolio", "Portfolio"),
    ("nav.about", "Über uns"),
    ("nav.contact", "Kontakt"),
    ("hero.title", "Websites, die Ihr Geschäft wachsen lassen"),
    ("contact.form.submit", "Nachricht senden"),
    ("footer.rights", "Alle Rechte vorbehalten."),
    ("common.loading", "Wird geladen..."),
    ("language.select", "Sprache"),
];

// ==================== Ukrainian ====================

pub const UKRAINIAN_FALLBACK: FallbackTable = &[
    ("nav.home", "Головна"),
    ("nav.services", "Послуги"),
    ("nav.portfolio", "Портфоліо"),
    ("nav.about", "Про нас"),
    ("nav.contact", "Контакти"),
    ("hero.title", "Сайти, що розвивають ваш бізнес"),
    ("contact.form.submit", "Надіслати"),
    ("footer.rights", "Усі права захищені."),
    ("common.loading", "Завантаження..."),
    ("language.select", "Мова"),
];

/// Look up static text for `key_path`, trying `language` then English.
pub fn fallback_text(language: Language, key_path: &str) -> Option<&'static str> {
    find(language.config().fallback, key_path)
        .or_else(|| find(Language::canonical().config().fallback, key_path))
}

fn find(table: FallbackTable, key_path: &str) -> Option<&'static str> {
    table
        .iter()
        .find(|(key, _)| *key == key_path)
        .map(|(_, text)| *text)
}
