// Wed Jan 15 2026 - Alex

//! Keys of the offset document.

pub const NAME: &str = "Name";
pub const CLASS_DESCRIPTOR: &str = "ClassDescriptor";
pub const CLASS_DESCRIPTOR_TO_CLASS_NAME: &str = "ClassDescriptorToClassName";
pub const CLASS_DESCRIPTOR_TO_PROPERTY_DESCRIPTOR: &str = "ClassDescriptorToPropertyDescriptor";
pub const CLASS_DESCRIPTOR_TO_EVENT_DESCRIPTOR: &str = "ClassDescriptorToEventDescriptor";
pub const CLASS_DESCRIPTOR_TO_BOUND_FUNCTION: &str = "ClassDescriptorToBoundFunction";
pub const PARENT: &str = "Parent";
pub const CHILDREN: &str = "Children";
pub const CHILDREN_END: &str = "ChildrenEnd";

pub const JOBS_POINTER: &str = "JobsPointer";
pub const JOB_NAME: &str = "Job_Name";
pub const RENDER_JOB_TO_RENDER_VIEW: &str = "RenderJobToRenderView";
pub const VISUAL_ENGINE: &str = "VisualEngine";
pub const FAKE_DATA_MODEL_POINTER: &str = "FakeDataModelPointer";
pub const FAKE_DATA_MODEL_TO_DATA_MODEL: &str = "FakeDataModelToDataModel";
pub const VIEW_MATRIX: &str = "viewmatrix";
pub const DIMENSIONS: &str = "Dimensions";

pub const GAME_ID: &str = "GameId";
pub const PLACE_ID: &str = "PlaceId";
pub const GAME_LOADED: &str = "GameLoaded";
pub const GRAVITY: &str = "Gravity";
pub const CAMERA: &str = "Camera";
pub const LOCAL_PLAYER: &str = "LocalPlayer";
pub const MODEL_INSTANCE: &str = "ModelInstance";
pub const USER_ID: &str = "UserId";

pub const HEALTH: &str = "Health";
pub const MAX_HEALTH: &str = "MaxHealth";
pub const WALK_SPEED: &str = "WalkSpeed";
pub const JUMP_POWER: &str = "JumpPower";

pub const CAMERA_POS: &str = "CameraPos";
pub const CAMERA_ROTATION: &str = "CameraRotation";
pub const CAMERA_SUBJECT: &str = "CameraSubject";

pub const PRIMITIVE: &str = "Primitive";
pub const POSITION: &str = "Position";
pub const PART_SIZE: &str = "PartSize";
pub const ROTATION: &str = "Rotation";
pub const CFRAME: &str = "CFrame";
pub const VELOCITY: &str = "Velocity";
pub const ANCHORED: &str = "Anchored";
pub const ANCHORED_MASK: &str = "AnchoredMask";
pub const CAN_COLLIDE: &str = "CanCollide";
pub const CAN_COLLIDE_MASK: &str = "CanCollideMask";

pub const VALUE: &str = "Value";
pub const SOUND_ID: &str = "SoundId";

pub const LOCAL_SCRIPT_BYTECODE: &str = "LocalScriptByteCode";
pub const LOCAL_SCRIPT_BYTECODE_POINTER: &str = "LocalScriptBytecodePointer";
pub const MODULE_SCRIPT_BYTECODE: &str = "ModuleScriptByteCode";
pub const MODULE_SCRIPT_BYTECODE_POINTER: &str = "ModuleScriptBytecodePointer";

/// Version metadata, never an offset.
pub const ROBLOX_VERSION: &str = "RobloxVersion";
