//! Unified view over every kind of contact

use super::errors::ContactResult;
use super::group::Group;
use super::individual::Individual;
use super::member::Membership;
use crate::core_gateway::session::Session;
use crate::core_gateway::types::Message;
use std::fmt;

/// Any entity a message can be sent to
#[derive(Debug)]
pub enum Contact {
    Individual(Individual),
    Group(Group),
    Member(Membership),
}

impl Contact {
    /// Raw numeric id; groups report their public group id
    pub fn id(&self) -> u32 {
        match self {
            Contact::Individual(individual) => individual.id().value(),
            Contact::Group(group) => group.id().value(),
            Contact::Member(member) => member.id().value(),
        }
    }

    pub fn session(&self) -> &Session {
        match self {
            Contact::Individual(individual) => individual.session(),
            Contact::Group(group) => group.session(),
            Contact::Member(member) => member.session(),
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, Contact::Group(_))
    }

    pub async fn send_message(&self, message: impl Into<Message>) -> ContactResult<()> {
        match self {
            Contact::Individual(individual) => individual.send_message(message).await,
            Contact::Group(group) => group.send_message(message).await,
            Contact::Member(member) => member.send_message(message).await,
        }
    }
}

impl From<Individual> for Contact {
    fn from(individual: Individual) -> Self {
        Contact::Individual(individual)
    }
}

impl From<Group> for Contact {
    fn from(group: Group) -> Self {
        Contact::Group(group)
    }
}

impl From<Membership> for Contact {
    fn from(member: Membership) -> Self {
        Contact::Member(member)
    }
}

impl fmt::Display for Contact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Contact::Individual(individual) => fmt::Display::fmt(individual, f),
            Contact::Group(group) => fmt::Display::fmt(group, f),
            Contact::Member(member) => fmt::Display::fmt(member, f),
        }
    }
}
