//! Domain records.
//!
//! Records serialize with the legacy wire names (`farmID`, `quanitity`,
//! `condictionMin`, ...), which is also the layout of the JSON snapshot.
//! `*Input` structs are the writable subset accepted by the API.

pub mod accounts;
pub mod batches;
pub mod breeds;
pub mod farms;
pub mod knowledge;
pub mod money;
pub mod sensors;
pub mod subscriptions;
pub mod validation;

pub use accounts::{Farmer, Role, User};
pub use batches::{ActivitySchedule, Batch, BatchActivity, BatchFeeding};
pub use breeds::{
    ActivityType, Breed, BreedActivity, BreedCondition, BreedFeeding, BreedGrowth, BreedType,
    ConditionType, FoodType,
};
pub use farms::{Device, Farm, FarmMembership, MembershipRole};
pub use knowledge::{Anomaly, ExceptionDisease, Medication, PatientHealth, Recommendation};
pub use money::Money;
pub use sensors::{Reading, SensorType};
pub use subscriptions::{
    Allocation, FarmerSubscription, Payment, PaymentStatus, Resource, ResourceCategory,
    ResourceType, SubscriptionStatus, SubscriptionType, Tier,
};
pub use validation::FieldErrors;
