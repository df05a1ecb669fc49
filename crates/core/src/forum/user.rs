//! Forum members.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tbg_protocol::UserGroup;
use tracing::warn;

use super::indexed::{HandlerArgs, Indexed, merge_fields, methods};
use crate::api::{self, ProfileForm};
use crate::error::{Result, require};
use crate::parser;
use crate::session::{SessionResolver, UsesSession};

/// Gender options of the `cust_gender` profile field, by form index.
const GENDERS: &[&str] = &["none", "male", "female", "non-binary"];

/// Social profile labels and their custom profile field names.
const SOCIAL_FIELDS: &[(&str, &str)] = &[
    ("jabber", "cust_jabber"),
    ("msn messenger", "cust_msn"),
    ("aol im", "cust_aolim"),
    ("yahoo! messenger", "cust_yahoo"),
];

methods! {
    /// Ways to refresh a [`User`].
    pub enum UserUpdate {
        /// Read the profile page of `uid`, or of the logged-in user.
        Get => "get",
    }
}

methods! {
    /// Ways to push a [`User`].
    pub enum UserSubmit {
        /// Save the forum profile. Takes an optional `birthday` argument.
        Profile => "profile",
    }
}

/// A forum member. Every field may be unknown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub uid: Option<u64>,
    pub name: Option<String>,
    /// URL of the avatar image.
    pub avatar: Option<String>,
    pub group: Option<UserGroup>,
    pub posts: Option<u64>,
    /// Signature; HTML when scraped, BBC when submitted.
    pub signature: Option<String>,
    pub email: Option<String>,
    /// Personal text shown under the avatar.
    pub blurb: Option<String>,
    pub location: Option<String>,
    pub real_name: Option<String>,
    /// Other identities, by network name.
    pub social: Option<BTreeMap<String, String>>,
    pub website: Option<String>,
    pub gender: Option<String>,
}

impl User {
    pub fn new(uid: u64) -> Self {
        Self {
            uid: Some(uid),
            ..Self::default()
        }
    }

    /// The logged-in user, once fetched with `update`.
    pub fn me() -> Self {
        Self::default()
    }

    /// Takes every field `other` knows.
    pub fn merge(&mut self, other: User) {
        merge_fields!(self, other; uid, name, avatar, group, posts, signature, email, blurb, location, real_name, social, website, gender);
    }

    fn fetch(&self, resolver: &dyn SessionResolver) -> Result<Self> {
        let session = resolver.current()?;
        let response = api::profile(&session, self.uid)?;
        parser::check_errors(&response)?;
        let parsed = parser::parse_profile(&response.body)?;

        let mut user = self.clone();
        user.merge(parsed);
        Ok(user)
    }

    fn save_profile(&self, resolver: &dyn SessionResolver, birthday: Option<NaiveDate>) -> Result<Self> {
        let (uid,) = require!(self; uid)?;
        let session = resolver.current()?;
        let response = api::edit_profile(&session, uid, &self.profile_form(birthday))?;
        parser::check_errors(&response)?;
        Ok(self.clone())
    }

    /// The profile form for the current field values.
    ///
    /// The forum does not report the website title, so the URL stands in for it.
    pub fn profile_form(&self, birthday: Option<NaiveDate>) -> ProfileForm {
        let mut custom_fields = vec![
            ("cust_real".to_string(), self.real_name.clone().unwrap_or_default()),
            ("cust_loca".to_string(), self.location.clone().unwrap_or_default()),
        ];
        for (label, field) in SOCIAL_FIELDS {
            let value = self
                .social
                .iter()
                .flatten()
                .find(|(name, _)| name.to_lowercase() == *label)
                .map(|(_, value)| value.clone())
                .unwrap_or_default();
            custom_fields.push((field.to_string(), value));
        }
        custom_fields.push(("cust_gender".to_string(), self.gender_index().to_string()));

        let website = self.website.clone().unwrap_or_default();
        ProfileForm {
            avatar: self.avatar.clone(),
            blurb: self.blurb.clone().unwrap_or_default(),
            birthday,
            signature: self.signature.clone().unwrap_or_default(),
            website_title: website.clone(),
            website_url: website,
            custom_fields,
        }
    }

    fn gender_index(&self) -> usize {
        let Some(gender) = &self.gender else {
            return 0;
        };
        let gender = gender.to_lowercase();
        GENDERS.iter().position(|known| *known == gender).unwrap_or_else(|| {
            warn!(target: "tbg.api", gender = %gender, "unknown gender, submitting none");
            0
        })
    }
}

impl UsesSession for User {}

impl Indexed for User {
    const ENTITY: &'static str = "User";
    const FIELDS: &'static [&'static str] = &[
        "uid", "name", "avatar", "group", "posts", "signature", "email", "blurb", "location", "real_name", "social", "website", "gender",
    ];
    const DEFAULT_SUBMIT: &'static str = "profile";

    type UpdateMethod = UserUpdate;
    type SubmitMethod = UserSubmit;

    fn dispatch_update(&self, method: UserUpdate, resolver: &dyn SessionResolver, args: HandlerArgs) -> Result<Self> {
        args.finish()?;
        match method {
            UserUpdate::Get => self.fetch(resolver),
        }
    }

    fn dispatch_submit(&self, method: UserSubmit, resolver: &dyn SessionResolver, mut args: HandlerArgs) -> Result<Self> {
        match method {
            UserSubmit::Profile => {
                let birthday = args.take::<NaiveDate>("birthday")?;
                args.finish()?;
                self.save_profile(resolver, birthday)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_keeps_fields_the_source_does_not_know() {
        let mut user = User {
            uid: Some(4),
            email: Some("a@b".to_string()),
            ..User::default()
        };
        user.merge(User {
            name: Some("Gilbert".to_string()),
            ..User::default()
        });
        assert_eq!(user.uid, Some(4));
        assert_eq!(user.email.as_deref(), Some("a@b"));
        assert_eq!(user.name.as_deref(), Some("Gilbert"));
    }

    #[test]
    fn profile_form_maps_custom_fields() {
        let mut social = BTreeMap::new();
        social.insert("Jabber".to_string(), "me@jabber".to_string());
        social.insert("Mastodon".to_string(), "@me".to_string());
        let user = User {
            uid: Some(1),
            gender: Some("Female".to_string()),
            location: Some("Here".to_string()),
            website: Some("https://example.com".to_string()),
            social: Some(social),
            ..User::default()
        };

        let form = user.profile_form(None);
        let field = |name: &str| {
            form.custom_fields
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str())
        };
        assert_eq!(field("cust_gender"), Some("2"));
        assert_eq!(field("cust_loca"), Some("Here"));
        assert_eq!(field("cust_jabber"), Some("me@jabber"));
        assert_eq!(field("cust_msn"), Some(""));
        assert_eq!(form.website_url, "https://example.com");
        assert_eq!(form.avatar, None);
    }

    #[test]
    fn unknown_gender_submits_none() {
        let user = User {
            gender: Some("Other".to_string()),
            ..User::default()
        };
        assert_eq!(user.gender_index(), 0);
    }
}
